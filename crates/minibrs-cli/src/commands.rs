use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use serde_json::{Value, json};
use uuid::Uuid;

use minibrs_core::{
    AppConfig, MinibrsError, REQUIRED_TASKS, Services, TaskStatus, open_storage,
};

use crate::cli::{Commands, ConfigAction};

/// State shared by every command of one process or shell session.
pub struct Context {
    pub config: AppConfig,
    /// The file `config` was loaded from, or would have been.
    pub config_path: PathBuf,
    pub json: bool,
    services: Option<Services>,
}

impl Context {
    pub fn new(config: AppConfig, config_path: PathBuf, json: bool) -> Self {
        Self {
            config,
            config_path,
            json,
            services: None,
        }
    }

    #[cfg(test)]
    pub fn with_services(config: AppConfig, json: bool, services: Services) -> Self {
        Self {
            config,
            config_path: AppConfig::config_path(),
            json,
            services: Some(services),
        }
    }

    /// Storage is opened on first use so `config` commands work without it.
    pub fn services(&mut self) -> Result<&Services> {
        if self.services.is_none() {
            let storage = open_storage(&self.config)?;
            self.services = Some(Services::new(storage));
        }
        match &self.services {
            Some(services) => Ok(services),
            None => bail!("storage unavailable"),
        }
    }
}

/// What a command produced: structured data for `--json`, lines for humans.
struct Reply {
    data: Value,
    text: Vec<String>,
}

impl Reply {
    fn new(data: Value) -> Self {
        Self {
            data,
            text: Vec::new(),
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.text.push(line.into());
        self
    }
}

pub fn parse_id(raw: &str) -> minibrs_core::Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| MinibrsError::InvalidId(raw.to_string()))
}

/// Run one command and write its output. `Shell` is handled by the caller.
pub fn execute(command: Commands, ctx: &mut Context, out: &mut impl Write) -> Result<()> {
    let start = Instant::now();
    tracing::debug!(?command, "executing command");

    let reply = match command {
        Commands::CreateGroup { name, course } => {
            let group = ctx.services()?.groups.create_group(&name, course)?;
            Reply::new(json!(group))
                .line(format!("OK: Created group: {} (ID: {})", group.name, group.id))
        }

        Commands::ListGroups => {
            let services = ctx.services()?;
            let groups = services.groups.get_all_groups()?;
            let mut items = Vec::with_capacity(groups.len());
            let mut reply = Reply::new(Value::Null);
            if groups.is_empty() {
                reply = reply.line("No groups found");
            } else {
                reply = reply.line("GROUPS:");
            }
            for group in &groups {
                let students = services.students.get_students_count_by_group(group.id)?;
                reply = reply.line(format!(
                    "- {} (Course {}) - {} students [ID: {}]",
                    group.name, group.course_number, students, group.id
                ));
                items.push(json!({
                    "id": group.id,
                    "name": group.name,
                    "courseNumber": group.course_number,
                    "studentCount": students,
                }));
            }
            reply.data = json!({ "items": items, "total": groups.len() });
            reply
        }

        Commands::DeleteGroup { group_id } => {
            let id = parse_id(&group_id)?;
            let services = ctx.services()?;
            let group = services.groups.get_group_by_id(id)?;
            services.groups.delete_group(id)?;
            Reply::new(json!({ "deleted": id })).line(format!("OK: Deleted group: {}", group.name))
        }

        Commands::UpdateGroup {
            group_id,
            name,
            course,
        } => {
            let id = parse_id(&group_id)?;
            let group = ctx.services()?.groups.update_group(id, &name, course)?;
            Reply::new(json!(group)).line(format!(
                "OK: Group updated: {} (Course: {})",
                group.name, group.course_number
            ))
        }

        Commands::ReportGroup { group_id } => {
            let id = parse_id(&group_id)?;
            let report = ctx.services()?.groups.get_group_report(id)?;

            let mut reply = Reply::new(json!({
                "group": report.group,
                "students": report.students.iter().map(|s| json!({
                    "student": s.student,
                    "tasks": s.tasks,
                    "submitted": s.submitted,
                    "progress": s.progress(),
                })).collect::<Vec<_>>(),
                "submittedTotal": report.submitted_total,
                "tasksTotal": report.tasks_total,
                "completionPercent": report.completion_percent(),
            }))
            .line(format!("GROUP REPORT: {}", report.group.name))
            .line(format!("Course: {}", report.group.course_number))
            .line(format!("Students: {}", report.students.len()))
            .line("");

            if report.students.is_empty() {
                reply = reply.line("No students in group");
            }
            for progress in &report.students {
                reply = reply.line(format!(
                    "- {}: {}/{REQUIRED_TASKS} tasks submitted [{}]",
                    progress.student.name,
                    progress.submitted,
                    progress.progress()
                ));
            }
            reply
                .line("")
                .line("TOTALS:")
                .line(format!(
                    "Submitted tasks: {}/{} ({:.1}%)",
                    report.submitted_total,
                    report.tasks_total,
                    report.completion_percent()
                ))
        }

        Commands::CreateStudent { name, group_id } => {
            let group_id = parse_id(&group_id)?;
            let student = ctx.services()?.students.create_student(&name, group_id)?;
            Reply::new(json!(student)).line(format!(
                "OK: Created student: {} (ID: {})",
                student.name, student.id
            ))
        }

        Commands::ListStudents { group_id } => {
            let group_id = parse_id(&group_id)?;
            let services = ctx.services()?;
            let students = services.students.get_students_by_group(group_id)?;
            let group = services.groups.get_group_by_id(group_id)?;

            let mut reply = Reply::new(Value::Null);
            if students.is_empty() {
                reply = reply.line("No students in group");
            } else {
                reply = reply.line(format!("STUDENTS OF GROUP {}:", group.name));
            }
            let mut items = Vec::with_capacity(students.len());
            for student in &students {
                let submitted = services.tasks.get_completed_tasks_count(student.id)?;
                reply = reply.line(format!(
                    "- {} [Submitted: {submitted}/{REQUIRED_TASKS}] [ID: {}]",
                    student.name, student.id
                ));
                items.push(json!({
                    "id": student.id,
                    "name": student.name,
                    "groupId": student.group_id,
                    "submitted": submitted,
                }));
            }
            reply.data = json!({ "group": group, "items": items, "total": students.len() });
            reply
        }

        Commands::DeleteStudent { student_id } => {
            let id = parse_id(&student_id)?;
            let services = ctx.services()?;
            let student = services.students.get_student_by_id(id)?;
            services.students.delete_student(id)?;
            Reply::new(json!({ "deleted": id }))
                .line(format!("OK: Deleted student: {}", student.name))
        }

        Commands::UpdateStudent {
            student_id,
            name,
            group_id,
        } => {
            let id = parse_id(&student_id)?;
            let group_id = parse_id(&group_id)?;
            let student = ctx
                .services()?
                .students
                .update_student(id, &name, Some(group_id))?;
            Reply::new(json!(student)).line(format!("OK: Student updated: {}", student.name))
        }

        Commands::MarkTask { student_id, number } => {
            let id = parse_id(&student_id)?;
            let services = ctx.services()?;
            let task = services.tasks.mark_task(id, number)?;
            let student = services.students.get_student_by_id(id)?;
            Reply::new(json!(task)).line(format!(
                "OK: Task {number} marked as submitted for student: {}",
                student.name
            ))
        }

        Commands::ResetTask { student_id, number } => {
            let id = parse_id(&student_id)?;
            let services = ctx.services()?;
            let task = services.tasks.reset_task(id, number)?;
            let student = services.students.get_student_by_id(id)?;
            Reply::new(json!(task)).line(format!(
                "OK: Task {number} reset for student: {}",
                student.name
            ))
        }

        Commands::ListTasks { student_id } => {
            let id = parse_id(&student_id)?;
            let services = ctx.services()?;
            let student = services.students.get_student_by_id(id)?;
            let tasks = services.students.get_student_tasks(id)?;
            let submitted = tasks.iter().filter(|t| t.is_submitted()).count();

            let mut reply = Reply::new(json!({
                "student": student,
                "items": tasks,
                "submitted": submitted,
            }))
            .line(format!("TASKS OF STUDENT {}:", student.name));
            for task in &tasks {
                let status = match task.status {
                    TaskStatus::Submitted => "SUBMITTED",
                    TaskStatus::NotSubmitted => "NOT SUBMITTED",
                };
                reply = reply.line(format!("- Task {}: {status}", task.number));
            }
            reply.line(format!("TOTAL: {submitted}/{REQUIRED_TASKS} tasks submitted"))
        }

        Commands::Config { action } => config_reply(ctx, action)?,

        Commands::Doctor => doctor_reply(ctx),

        Commands::Shell => Reply::new(Value::Null).line("Already in the interactive shell"),
    };

    let dur = start.elapsed().as_millis();
    if ctx.json {
        let envelope = json!({
            "status": "ok",
            "data": reply.data,
            "meta": { "duration_ms": dur },
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&envelope)?)?;
    } else {
        for line in &reply.text {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn config_reply(ctx: &Context, action: ConfigAction) -> Result<Reply> {
    let reply = match action {
        ConfigAction::List => {
            let kv = ctx.config.key_values();
            let lines: Vec<String> = kv.iter().map(|(k, v)| format!("{k} = {v}")).collect();
            Reply {
                data: json!(kv),
                text: lines,
            }
        }
        ConfigAction::Get { key } => {
            let kv = ctx.config.key_values();
            match kv.get(key.as_str()) {
                Some(value) => {
                    Reply::new(json!({ "key": key, "value": value })).line(value.clone())
                }
                None => {
                    return Err(MinibrsError::Config(format!("Unknown config key: {key}")).into());
                }
            }
        }
        ConfigAction::Path => {
            let path = &ctx.config_path;
            let exists = path.exists();
            Reply::new(json!({ "path": path, "exists": exists }))
                .line(path.display().to_string())
        }
    };
    Ok(reply)
}

/// Diagnostics never fail the command; problems are reported as lines.
fn doctor_reply(ctx: &mut Context) -> Reply {
    let mut checks = Vec::new();
    let mut lines = Vec::new();

    let config_path = ctx.config_path.clone();
    if config_path.exists() {
        lines.push(format!("✓ Config: {}", config_path.display()));
    } else {
        lines.push("○ Config: not found (using defaults)".to_string());
    }
    checks.push(json!({ "check": "config", "ok": true, "path": config_path }));

    let mut issues = 0;
    match ctx.services() {
        Ok(services) => {
            let storage = services.storage().describe();
            let groups = services.groups.get_all_groups().map(|g| g.len());
            let students = services.students.get_all_students().map(|s| s.len());
            let tasks = services.tasks.get_total_tasks_count();
            match (groups, students, tasks) {
                (Ok(g), Ok(s), Ok(t)) => {
                    lines.push(format!("✓ Storage: {storage}"));
                    lines.push(format!("  {g} groups, {s} students, {t} tasks"));
                    checks.push(json!({
                        "check": "storage", "ok": true, "backend": storage,
                        "groups": g, "students": s, "tasks": t,
                    }));
                }
                (g, s, t) => {
                    issues += 1;
                    let err = [g.err(), s.err(), t.err()]
                        .into_iter()
                        .flatten()
                        .next()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    lines.push(format!("✗ Storage: {storage}: {err}"));
                    checks.push(json!({ "check": "storage", "ok": false, "error": err }));
                }
            }
        }
        Err(e) => {
            issues += 1;
            lines.push(format!("✗ Storage: {e}"));
            checks.push(json!({ "check": "storage", "ok": false, "error": e.to_string() }));
        }
    }

    if issues == 0 {
        lines.push(String::new());
        lines.push("All checks passed ✓".to_string());
    } else {
        lines.push(String::new());
        lines.push(format!("{issues} issues found"));
    }

    Reply {
        data: json!({ "checks": checks, "issues": issues }),
        text: lines,
    }
}

/// JSON error envelope printed by `--json` runs.
pub fn error_envelope(err: &anyhow::Error) -> Value {
    let kind = err
        .downcast_ref::<MinibrsError>()
        .map(MinibrsError::kind)
        .unwrap_or("error");
    json!({ "status": "error", "error": kind, "message": err.to_string() })
}
