//! Command-line front ends: stdin REPL and the built-in demo.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::error;

use crate::memory::SessionSnapshot;
use crate::pipeline::{Orchestrator, ResultEnvelope};

const TEXT_SAMPLES: [&str; 3] = [
    "Fix the login bug by Friday - it's critical",
    "Schedule team sync meeting about new API design",
    "Review Q1 marketing presentation by end of week",
];

const EMAIL_SAMPLES: [&str; 2] = [
    "From: manager@company.com
To: you@company.com
Subject: Review Q1 Marketing Presentation

Hi, can you review the Q1 marketing presentation by end of week?
It's needed for the board meeting. Thanks!",
    "From: dev-lead@company.com
To: team@company.com
Subject: URGENT - Fix database connection issue

Team, we have a critical issue with the database connection pool.
This is blocking production and needs immediate attention.
Priority: BLOCKER",
];

const VOICE_SAMPLES: [&str; 2] = ["test_voice_1.wav", "test_voice_2.wav"];

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Process { input: String, hint: &'static str },
    /// Start collecting a multi-line email.
    Email,
    Memory,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    match line {
        "" => ReplCommand::Empty,
        "/quit" | "/exit" => ReplCommand::Quit,
        "/memory" => ReplCommand::Memory,
        "/email" => ReplCommand::Email,
        _ => match line.strip_prefix("/voice") {
            Some(rest) if rest.is_empty() || rest.starts_with(' ') => ReplCommand::Process {
                input: rest.trim().to_string(),
                hint: "voice",
            },
            _ => ReplCommand::Process {
                input: line.to_string(),
                hint: "text",
            },
        },
    }
}

/// Read lines until a lone `.` (or EOF) and join them.
async fn read_email<R>(lines: &mut tokio::io::Lines<R>) -> std::io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "." {
            break;
        }
        body.push(line);
    }
    Ok(body.join("\n"))
}

async fn process(orchestrator: &Orchestrator, input: &str, hint: &str) -> Option<ResultEnvelope> {
    match orchestrator.process_input(input, hint).await {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            error!(error = %e, "Input rejected");
            eprintln!("Error: {e}");
            None
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

/// Interactive loop. Returns the number of inputs processed.
pub async fn run_repl<R>(orchestrator: &Orchestrator, reader: R) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut processed = 0;

    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Memory => print_json(&orchestrator.get_memory_context()),
            ReplCommand::Email => {
                eprintln!("Paste the email, end with a line containing only '.'");
                let email = read_email(&mut lines).await?;
                if let Some(envelope) = process(orchestrator, &email, "email").await {
                    print_json(&envelope);
                }
                processed += 1;
            }
            ReplCommand::Process { input, hint } => {
                if let Some(envelope) = process(orchestrator, &input, hint).await {
                    print_json(&envelope);
                }
                processed += 1;
            }
        }
        eprint!("> ");
    }
    Ok(processed)
}

/// Demo outcome counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub total: usize,
    pub successful: usize,
}

/// Run the sample inputs through every channel and print a session summary.
pub async fn run_demo(orchestrator: &Orchestrator) -> DemoSummary {
    let batches: [(&str, &[&str]); 3] = [
        ("text", &TEXT_SAMPLES),
        ("email", &EMAIL_SAMPLES),
        ("voice", &VOICE_SAMPLES),
    ];

    let mut summary = DemoSummary {
        total: 0,
        successful: 0,
    };
    for (hint, inputs) in batches {
        println!("\n== {} inputs ==", hint.to_uppercase());
        for input in inputs {
            let preview: String = input.chars().take(100).collect();
            println!("\n> {preview}");
            summary.total += 1;
            if let Some(envelope) = process(orchestrator, input, hint).await {
                println!("  {}", describe(&envelope));
                if envelope.is_success() {
                    summary.successful += 1;
                }
            }
        }
    }

    print_session_summary(&orchestrator.get_memory_context());
    println!(
        "\nProcessed {} inputs, {} tasks created",
        summary.total, summary.successful
    );
    summary
}

fn print_session_summary(snapshot: &SessionSnapshot) {
    println!("\n== Session ==");
    println!("Interactions: {}", snapshot.interactions.len());
    println!("Tasks created: {}", snapshot.created_tasks.len());

    let patterns = &snapshot.patterns;
    if !patterns.is_empty() {
        println!("Average priority: {:.1}", patterns.average_priority);
        println!("Common labels: {}", patterns.common_labels.join(", "));
        if let Some(source) = patterns.preferred_source {
            println!("Preferred channel: {source}");
        }
    }
}

/// Short human-readable line for an envelope.
pub fn describe(envelope: &ResultEnvelope) -> String {
    match envelope {
        ResultEnvelope::Created {
            task_id,
            title,
            source,
            priority,
            ..
        } => format!("created #{task_id} '{title}' from {source} (priority {priority})"),
        ResultEnvelope::Failed { error, source, .. } => format!("failed ({source}): {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("   "), ReplCommand::Empty);
        assert_eq!(parse_line("/quit"), ReplCommand::Quit);
        assert_eq!(parse_line("/memory"), ReplCommand::Memory);
        assert_eq!(parse_line("/email"), ReplCommand::Email);
        assert_eq!(
            parse_line("/voice test_voice_1.wav"),
            ReplCommand::Process {
                input: "test_voice_1.wav".into(),
                hint: "voice"
            }
        );
        assert_eq!(
            parse_line("Buy milk"),
            ReplCommand::Process {
                input: "Buy milk".into(),
                hint: "text"
            }
        );
    }

    #[test]
    fn voice_prefix_needs_separator() {
        assert_eq!(
            parse_line("/voicemail check"),
            ReplCommand::Process {
                input: "/voicemail check".into(),
                hint: "text"
            }
        );
    }

    #[tokio::test]
    async fn email_is_read_until_dot() {
        let input: &[u8] = b"From: a@b.com\nSubject: X\n\nbody text\n.\nnext line\n";
        let mut lines = input.lines();
        let email = read_email(&mut lines).await.unwrap();
        assert_eq!(email, "From: a@b.com\nSubject: X\n\nbody text");
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("next line"));
    }

    #[test]
    fn describes_envelopes() {
        let failed = ResultEnvelope::failed("Task creation failed: boom", "voice");
        assert_eq!(describe(&failed), "failed (voice): Task creation failed: boom");
    }
}
