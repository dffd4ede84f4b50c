use std::fmt::Write;

use crate::engine::analytics::{AnalyticsReport, AnalyticsView};
use crate::engine::council::CouncilBoard;
use crate::engine::export::{GradeSheetRow, YearSummary};
use crate::models::{GroupStat, StudentStatus, TermLimit};

const UTF8_BOM: &str = "\u{FEFF}";

pub fn term_label(limit: TermLimit) -> String {
    if limit.is_full_year() {
        "Final".to_string()
    } else {
        format!("Up to bimester {}", limit.get())
    }
}

fn grade(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

fn retained_list(subjects: &[String]) -> String {
    if subjects.is_empty() {
        "-".to_string()
    } else {
        subjects.join(", ")
    }
}

pub fn build_council_report(board: &CouncilBoard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Council: {}", board.class.name);
    let _ = writeln!(
        output,
        "Year {} / reference: {}",
        board.class.year,
        term_label(board.term_limit)
    );
    let _ = writeln!(output);

    if board.rows.is_empty() {
        let _ = writeln!(output, "No students match this selection.");
        return output;
    }

    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "| Student | Status | Avg >= 5 | Avg < 5 | Result | Retained / pending |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for row in &board.rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            row.student.name,
            row.student.status.label(),
            row.outcome.count_above_threshold,
            row.outcome.count_below_threshold,
            row.outcome.overall.label(),
            retained_list(&row.outcome.retained_or_pending_subjects)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Final averages");
    let header: Vec<&str> = board.subjects.iter().map(|s| s.name.as_str()).collect();
    let _ = writeln!(output, "| Student | {} |", header.join(" | "));
    let _ = writeln!(output, "|---|{}", "---|".repeat(header.len()));
    for row in &board.rows {
        let cells: Vec<String> = row
            .results
            .iter()
            .map(|r| {
                let mut cell = if r.evaluated {
                    grade(r.final_average)
                } else {
                    "-".to_string()
                };
                if r.recovered {
                    cell.push_str(" (R)");
                }
                cell
            })
            .collect();
        let _ = writeln!(output, "| {} | {} |", row.student.name, cells.join(" | "));
    }

    output
}

fn write_ranking(output: &mut String, title: &str, stats: &[GroupStat]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if stats.is_empty() {
        let _ = writeln!(output, "No grades recorded for this selection.");
        return;
    }
    for stat in stats {
        let _ = writeln!(
            output,
            "- {}: {:.2} ({} grades)",
            stat.group_name, stat.average, stat.count
        );
    }
}

pub fn build_analytics_report(year: i32, report: &AnalyticsReport, top: usize) -> String {
    let mut output = String::new();
    let hierarchy = &report.hierarchy;
    let view = match report.view {
        AnalyticsView::Accumulated(limit) => format!("accumulated average ({})", term_label(limit)),
        AnalyticsView::Bimester(term) => format!("bimester {} grades", term.number()),
    };

    let _ = writeln!(output, "# Academic Performance Report");
    let _ = writeln!(output, "Year {year}, {view}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Students in scope: {}", report.students);
    let _ = writeln!(output, "- Subjects in scope: {}", report.subjects.len());
    let _ = writeln!(output, "- Evaluated grades: {}", hierarchy.evaluated);
    match (hierarchy.global_average, hierarchy.pass_rate) {
        (Some(average), Some(rate)) => {
            let _ = writeln!(output, "- Global average: {average:.2}");
            let _ = writeln!(output, "- Pass rate: {:.1}%", rate * 100.0);
        }
        _ => {
            let _ = writeln!(output, "- No grades recorded for this selection.");
        }
    }

    write_ranking(&mut output, "Knowledge Areas", &hierarchy.area_stats);
    write_ranking(&mut output, "Sub-areas", hierarchy.top_sub_areas(top));
    write_ranking(&mut output, "Subjects", hierarchy.top_subjects(top));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Evolution");
    if hierarchy.class_evolution.is_empty() {
        let _ = writeln!(output, "No bimester grades recorded for this selection.");
    } else {
        let _ = writeln!(output, "| Class | B1 | B2 | B3 | B4 |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for series in &hierarchy.class_evolution {
            let points: Vec<String> = series.points.iter().map(|p| grade(*p)).collect();
            let _ = writeln!(output, "| {} | {} |", series.class_name, points.join(" | "));
        }
    }

    output
}

pub fn build_summary_report(summary: &YearSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Academic Year {}", summary.year);
    let _ = writeln!(output, "- Students: {}", summary.students);
    for (status, count) in [
        (StudentStatus::Active, summary.active),
        (StudentStatus::Transferred, summary.transferred),
        (StudentStatus::Dropped, summary.dropped),
    ] {
        let _ = writeln!(output, "  - {}: {}", status.label(), count);
    }
    let _ = writeln!(output, "- Classes: {}", summary.classes);
    let _ = writeln!(output, "- Subjects: {}", summary.subjects);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Calendar");

    let date = |d: Option<chrono::NaiveDate>| {
        d.map_or_else(|| "not set".to_string(), |d| d.format("%d/%m/%Y").to_string())
    };
    match &summary.calendar {
        Some(calendar) => {
            for (index, end) in calendar.bimester_ends().iter().enumerate() {
                let _ = writeln!(output, "- End of bimester {}: {}", index + 1, date(*end));
            }
            let _ = writeln!(output, "- Recovery start: {}", date(calendar.rec_start));
            let _ = writeln!(output, "- Recovery end: {}", date(calendar.rec_end));
        }
        None => {
            let _ = writeln!(output, "No calendar configured for this year.");
        }
    }
    output
}

fn csv_buffer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(UTF8_BOM.as_bytes().to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush CSV buffer: {}", err.error()))
}

/// Semicolon-separated council sheet, prefixed with a UTF-8 BOM.
pub fn council_csv(board: &CouncilBoard) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv_buffer();
    writer.write_record([
        "Student",
        "Registration",
        "Status",
        "Averages >= 5",
        "Averages < 5",
        "System result",
        "Retained / pending subjects",
    ])?;

    for row in &board.rows {
        writer.write_record([
            row.student.name.clone(),
            row.student.registration_number.clone().unwrap_or_default(),
            row.student.status.label().to_string(),
            row.outcome.count_above_threshold.to_string(),
            row.outcome.count_below_threshold.to_string(),
            row.outcome.overall.label().to_string(),
            retained_list(&row.outcome.retained_or_pending_subjects),
        ])?;
    }

    finish(writer)
}

pub fn grade_sheet_csv(rows: &[GradeSheetRow]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv_buffer();
    writer.write_record([
        "Registration",
        "Student",
        "Class",
        "Subject",
        "B1",
        "B2",
        "B3",
        "B4",
        "Annual average",
        "Recovery",
        "Required recovery score",
        "Final average",
        "Status",
    ])?;

    for row in rows {
        let [b1, b2, b3, b4] = row.bimesters.map(grade);
        writer.write_record([
            row.registration_number.clone().unwrap_or_default(),
            row.student_name.clone(),
            row.class_name.clone(),
            row.subject_name.clone(),
            b1,
            b2,
            b3,
            b4,
            format!("{:.1}", row.annual_average),
            grade(row.recovery_score),
            grade(row.target.required_score),
            grade(row.final_average),
            row.status.label().to_string(),
        ])?;
    }

    finish(writer)
}
