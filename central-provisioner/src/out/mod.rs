use std::fmt::Write as _;

use anyhow::Result;

use crate::orchestrator::{PhaseOutcome, RunReport};
use crate::types::Category;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutMode {
    Text,
    Json,
}

impl OutMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutMode::Json,
            _ => OutMode::Text,
        }
    }
}

pub fn render(report: &RunReport, mode: OutMode) -> Result<String> {
    match mode {
        OutMode::Json => Ok(serde_json::to_string_pretty(report)?),
        OutMode::Text => Ok(render_text(report)),
    }
}

pub fn emit_stdout(report: &RunReport, mode: OutMode) -> Result<()> {
    println!("{}", render(report, mode)?);
    Ok(())
}

fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    if let Some(provider) = report.provider {
        let _ = writeln!(out, "{:<7} {provider}", "via:");
    }
    for category in Category::ALL {
        let line = match report.phase(category) {
            PhaseOutcome::Skipped => "skipped".to_string(),
            PhaseOutcome::Aborted(e) => format!("aborted: {e}"),
            PhaseOutcome::Completed(s) if category == Category::Names => {
                format!("Renamed {} out of {} devices", s.succeeded, s.total)
            }
            PhaseOutcome::Completed(s) => {
                let mut l = format!("{}/{} ok", s.succeeded, s.attempted);
                if s.devices_failed > 0 {
                    let _ = write!(l, ", {} devices rejected", s.devices_failed);
                }
                l
            }
        };
        let _ = writeln!(out, "{:<7} {line}", format!("{category}:"));
    }

    for category in Category::ALL {
        let Some(summary) = report.phase(category).summary() else { continue };
        for o in &summary.outcomes {
            if !o.succeeded {
                let _ = writeln!(out, "  FAILED {category} {}: {}", o.target, o.detail);
            } else if !o.rejected.is_empty() {
                let _ = writeln!(out, "  REJECTED {category} {}: {}", o.target, o.rejected.join(", "));
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CategoryError;
    use crate::types::{CategorySummary, OperationOutcome};

    fn report() -> RunReport {
        let mut lobby = OperationOutcome::ok("Lobby", "1 succeeded, 1 failed");
        lobby.rejected = vec!["A2".into()];
        RunReport {
            provider: None,
            sites: PhaseOutcome::Completed(CategorySummary::from_outcomes(
                Category::Sites,
                2,
                vec![lobby, OperationOutcome::failed("Roof", "code 500: boom")],
            )),
            groups: PhaseOutcome::Aborted(CategoryError::NotFound {
                category: Category::Groups,
                missing: vec!["ops".into()],
            }),
            names: PhaseOutcome::Completed(CategorySummary::from_outcomes(
                Category::Names,
                3,
                vec![OperationOutcome::ok("S1", "renamed to ap-1"), OperationOutcome::ok("S3", "renamed to ap-3")],
            )),
        }
    }

    #[test]
    fn text_report_lists_phases_and_failures() {
        let text = render(&report(), OutMode::Text).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "sites:  1/2 ok, 1 devices rejected");
        assert_eq!(lines[1], "groups: aborted: groups not found in Central: ops");
        assert_eq!(lines[2], "names:  Renamed 2 out of 3 devices");
        assert!(lines.contains(&"  REJECTED sites Lobby: A2"));
        assert!(lines.contains(&"  FAILED sites Roof: code 500: boom"));
    }

    #[test]
    fn provider_heads_the_text_report_when_known() {
        let mut r = report();
        r.provider = Some("dry-run");
        let text = render(&r, OutMode::Text).unwrap();
        assert_eq!(text.lines().next(), Some("via:    dry-run"));

        let v: serde_json::Value = serde_json::from_str(&render(&r, OutMode::Json).unwrap()).unwrap();
        assert_eq!(v["provider"], "dry-run");
        let v = serde_json::to_value(report()).unwrap();
        assert!(v.get("provider").is_none());
    }

    #[test]
    fn json_report_is_machine_readable() {
        let json = render(&report(), OutMode::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["groups"]["status"], "aborted");
        assert_eq!(v["groups"]["detail"]["kind"], "not_found");
        assert_eq!(v["names"]["detail"]["succeeded"], 2);
    }

    #[test]
    fn unknown_mode_falls_back_to_text() {
        assert_eq!(OutMode::parse("JSON"), OutMode::Json);
        assert_eq!(OutMode::parse("yaml"), OutMode::Text);
    }
}
