//! Job list, detail and delete commands.

use chrono::Local;
use docdash::{Dashboard, JobId, JobRow};

use super::CommandError;

pub fn format_row(row: &JobRow) -> String {
    let created = row.job.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let mut line = format!(
        "#{:<5} {:<10} {:>3}%  {}  {}",
        row.id(),
        row.status().to_string(),
        row.progress_percent(),
        created,
        row.display_name()
    );
    if let Some(link) = row.detail_link() {
        line.push_str(&format!("  {}", link));
    }
    if row.poll_failures > 0 {
        line.push_str(&format!("  ({} failed checks)", row.poll_failures));
    }
    line
}

fn print_rows(rows: &[JobRow]) {
    if rows.is_empty() {
        println!("No documents uploaded yet.");
        return;
    }
    for row in rows {
        println!("{}", format_row(row));
    }
}

pub async fn list_jobs(dashboard: &Dashboard) -> Result<(), CommandError> {
    dashboard.jobs().activate().await?;
    print_rows(&dashboard.jobs().rows());
    Ok(())
}

/// Lists the jobs, then reprints on every change until no row is polling.
pub async fn watch_jobs(dashboard: &Dashboard) -> Result<(), CommandError> {
    let jobs = dashboard.jobs();
    let mut rx = jobs.subscribe();
    jobs.activate().await?;

    loop {
        let snapshot = rx.borrow_and_update().clone();
        print_rows(&snapshot.rows);
        if snapshot.rows.iter().all(|row| !row.polling) {
            break;
        }
        println!();
        if rx.changed().await.is_err() {
            break;
        }
    }
    Ok(())
}

pub async fn show_job(dashboard: &Dashboard, id: JobId) -> Result<(), CommandError> {
    let detail = dashboard.job_detail(id).await?;
    println!("{} (#{})", detail.display_name(), detail.id());
    println!("Status: {}", detail.status());
    println!();
    println!("{}", detail.summary());
    if detail.chat_available() {
        println!();
        println!("Ask questions with: docdash chat {}", detail.id());
    }
    Ok(())
}

pub async fn delete_job(dashboard: &Dashboard, id: JobId) -> Result<(), CommandError> {
    dashboard.jobs().delete_row(id).await?;
    println!("Deleted job #{}", id);
    Ok(())
}
