use intake_core::pipeline::{Outcome, RunReport};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Left-aligned columns separated by two spaces; the last column is not padded.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let render = |cells: Vec<&str>| {
        let last = cells.len().saturating_sub(1);
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == last {
                    c.to_string()
                } else {
                    format!("{c:<width$}", width = widths.get(i).copied().unwrap_or(0))
                }
            })
            .collect();
        println!("{}", line.join("  "));
    };

    render(headers.to_vec());
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    render(rule.iter().map(String::as_str).collect());
    for row in rows {
        render(row.iter().map(String::as_str).collect());
    }
}

/// Human-readable summary of a run, ending with the success/failure line.
pub fn print_report(report: &RunReport) {
    match &report.outcome {
        Outcome::NoOp => println!("No actions requested in issue body."),
        Outcome::Completed {
            accepted,
            added,
            already_present,
            persisted,
        } => {
            for r in accepted {
                println!("Validated {r} ({})", r.description);
            }
            if *persisted {
                for key in added {
                    println!("Added {key} to the allow-list.");
                }
                for key in already_present {
                    println!("{key} is already in the allow-list.");
                }
            } else {
                println!("Validate-only run: allow-list not modified.");
            }
        }
        Outcome::Failed {
            stage,
            code,
            message,
        } => println!("Failed at {stage} [{code}]: {message}"),
    }
    if let Some(warning) = &report.cleanup_warning {
        println!("warning: {warning}");
    }
    if report.success() {
        println!("success: run {} completed", report.run_id);
    } else {
        println!("failure: run {} did not complete", report.run_id);
    }
}
