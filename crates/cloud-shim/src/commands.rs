//! Subcommand implementations

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};
use engine_bridge::{ApplyOptions, CloudTaskClient, TaskDetail, TaskInfo};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

pub async fn list(client: &dyn CloudTaskClient, json: bool) -> Result<()> {
    let tasks = client.list().await?;
    if json {
        return print_json(&tasks);
    }
    println!("{}", task_table(&tasks));
    Ok(())
}

pub async fn show(client: &dyn CloudTaskClient, id: &str, json: bool) -> Result<()> {
    let detail = client.show(id).await?;
    if json {
        return print_json(&detail);
    }
    print!("{}", format_detail(&detail));
    Ok(())
}

pub async fn diff(client: &dyn CloudTaskClient, id: &str) -> Result<()> {
    let diff = client.diff(id).await?;
    print!("{}", with_trailing_newline(diff));
    Ok(())
}

pub async fn apply(
    client: &dyn CloudTaskClient,
    id: &str,
    options: &ApplyOptions,
    json: bool,
) -> Result<()> {
    let outcome = client.apply(id, options).await?;
    if json {
        return print_json(&outcome);
    }
    println!("Applied task {id} on branch {}", outcome.branch);
    Ok(())
}

fn task_table(tasks: &[TaskInfo]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Status", "Updated"]);

    for task in tasks {
        let status = task.status.as_deref().unwrap_or("unknown");
        let status_cell = match status {
            "completed" | "succeeded" => Cell::new(status).fg(Color::Green),
            "failed" | "error" => Cell::new(status).fg(Color::Red),
            "running" | "pending" => Cell::new(status).fg(Color::Yellow),
            _ => Cell::new(status),
        };

        table.add_row(vec![
            Cell::new(&task.id),
            Cell::new(&task.title),
            status_cell,
            Cell::new(task.updated_at.as_deref().unwrap_or("-")),
        ]);
    }

    table
}

fn format_detail(detail: &TaskDetail) -> String {
    let mut out = format!("{}: {}\n", detail.info.id, detail.info.title);
    if let Some(description) = &detail.description {
        out.push_str(description);
        out.push('\n');
    }
    for turn in &detail.conversation {
        out.push_str(&format!("[{}] {}\n", turn.role, turn.content));
    }
    out
}

fn with_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_bridge::ConversationTurn;

    fn info(id: &str, status: Option<&str>) -> TaskInfo {
        TaskInfo {
            id: id.to_string(),
            title: format!("Task {id}"),
            status: status.map(str::to_string),
            updated_at: None,
        }
    }

    #[test]
    fn table_lists_every_task() {
        let rendered = task_table(&[info("a-1", Some("completed")), info("b-2", None)]).to_string();
        assert!(rendered.contains("a-1"));
        assert!(rendered.contains("Task b-2"));
        assert!(rendered.contains("unknown"));
    }

    #[test]
    fn detail_prints_conversation_turns() {
        let detail = TaskDetail {
            info: info("a-1", None),
            description: Some("Fix the bug".to_string()),
            conversation: vec![ConversationTurn {
                role: "user".to_string(),
                content: "please".to_string(),
                timestamp: None,
                metadata: None,
            }],
            metadata: None,
            diff: None,
        };

        assert_eq!(format_detail(&detail), "a-1: Task a-1\nFix the bug\n[user] please\n");
    }

    #[test]
    fn diff_output_ends_with_newline() {
        assert_eq!(with_trailing_newline("--- a".to_string()), "--- a\n");
        assert_eq!(with_trailing_newline("--- a\n".to_string()), "--- a\n");
    }
}
