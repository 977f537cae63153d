//! Report serialization for refined conjunctions and maneuver suggestions
//!
//! The reporting boundary consumes the pipeline's terminal artifacts and
//! renders CSV, Markdown, or JSON. Rows keep the order they were handed in
//! (the pipeline already sorts by TCA). Times are ISO-8601 UTC with
//! millisecond precision.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde::Serialize;

use crate::maneuver::DvSuggestion;
use crate::refine::RefinedConjunction;

/// Flat, serializable view of one refined conjunction.
#[derive(Debug, Serialize)]
pub struct ConjunctionRecord {
    pub a: String,
    pub b: String,
    pub tca_utc: String,
    pub dca_km: f64,
    pub vrel_kms: f64,
    pub flags: Vec<String>,
}

impl From<&RefinedConjunction> for ConjunctionRecord {
    fn from(refined: &RefinedConjunction) -> Self {
        Self {
            a: refined.a.clone(),
            b: refined.b.clone(),
            tca_utc: refined.tca.to_rfc3339_opts(SecondsFormat::Millis, true),
            dca_km: refined.dca_km,
            vrel_kms: refined.relative_speed_kms(),
            flags: refined.flags.iter().map(|f| f.as_str().to_string()).collect(),
        }
    }
}

/// Flat, serializable view of one maneuver suggestion.
#[derive(Debug, Serialize)]
pub struct SuggestionRecord {
    pub a: String,
    pub b: String,
    pub burn_utc: String,
    pub dv_mps: f64,
    pub dv_x_kms: f64,
    pub dv_y_kms: f64,
    pub dv_z_kms: f64,
    pub projected_dca_km: f64,
    pub feasible: bool,
}

impl From<&DvSuggestion> for SuggestionRecord {
    fn from(suggestion: &DvSuggestion) -> Self {
        Self {
            a: suggestion.a.clone(),
            b: suggestion.b.clone(),
            burn_utc: suggestion
                .burn_time
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            dv_mps: suggestion.dv_mps,
            dv_x_kms: suggestion.dv_kms.x,
            dv_y_kms: suggestion.dv_kms.y,
            dv_z_kms: suggestion.dv_kms.z,
            projected_dca_km: suggestion.projected_dca_km,
            feasible: suggestion.feasible,
        }
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or newline;
/// inner quotes are doubled. TLE name lines are free text.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Escape the Markdown table cell delimiter.
fn md_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// CSV with a header row; one row per conjunction.
pub fn conjunctions_to_csv(conjunctions: &[RefinedConjunction]) -> String {
    let mut out = String::from("a,b,tca_utc,dca_km,vrel_kms,flags\n");
    for record in conjunctions.iter().map(ConjunctionRecord::from) {
        let _ = writeln!(
            out,
            "{},{},{},{:.6},{:.6},{}",
            csv_field(&record.a),
            csv_field(&record.b),
            record.tca_utc,
            record.dca_km,
            record.vrel_kms,
            record.flags.join(";"),
        );
    }
    out
}

/// Markdown table of conjunctions.
pub fn conjunctions_to_markdown(conjunctions: &[RefinedConjunction]) -> String {
    let mut out = String::from(
        "| a | b | TCA (UTC) | DCA (km) | v_rel (km/s) | flags |\n\
         |---|---|-----------|----------|--------------|-------|\n",
    );
    for record in conjunctions.iter().map(ConjunctionRecord::from) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.6} | {:.6} | {} |",
            md_cell(&record.a),
            md_cell(&record.b),
            record.tca_utc,
            record.dca_km,
            record.vrel_kms,
            record.flags.join(";"),
        );
    }
    out
}

/// JSON array of conjunction records.
pub fn conjunctions_to_json(
    conjunctions: &[RefinedConjunction],
) -> Result<String, serde_json::Error> {
    let records: Vec<ConjunctionRecord> = conjunctions.iter().map(Into::into).collect();
    serde_json::to_string_pretty(&records)
}

/// CSV with a header row; one row per suggestion.
pub fn suggestions_to_csv(suggestions: &[DvSuggestion]) -> String {
    let mut out = String::from(
        "a,b,burn_utc,dv_mps,dv_x_kms,dv_y_kms,dv_z_kms,projected_dca_km,feasible\n",
    );
    for record in suggestions.iter().map(SuggestionRecord::from) {
        let _ = writeln!(
            out,
            "{},{},{},{:.6},{:.9},{:.9},{:.9},{:.6},{}",
            csv_field(&record.a),
            csv_field(&record.b),
            record.burn_utc,
            record.dv_mps,
            record.dv_x_kms,
            record.dv_y_kms,
            record.dv_z_kms,
            record.projected_dca_km,
            record.feasible,
        );
    }
    out
}

/// Markdown table of suggestions.
pub fn suggestions_to_markdown(suggestions: &[DvSuggestion]) -> String {
    let mut out = String::from(
        "| a | b | burn (UTC) | dv (m/s) | projected DCA (km) | feasible |\n\
         |---|---|------------|----------|--------------------|----------|\n",
    );
    for record in suggestions.iter().map(SuggestionRecord::from) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.6} | {:.6} | {} |",
            md_cell(&record.a),
            md_cell(&record.b),
            record.burn_utc,
            record.dv_mps,
            record.projected_dca_km,
            record.feasible,
        );
    }
    out
}

/// JSON array of suggestion records.
pub fn suggestions_to_json(suggestions: &[DvSuggestion]) -> Result<String, serde_json::Error> {
    let records: Vec<SuggestionRecord> = suggestions.iter().map(Into::into).collect();
    serde_json::to_string_pretty(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::RefinementFlag;
    use crate::state::StateVector;
    use chrono::{TimeZone, Utc};
    use nalgebra::Vector3;

    fn sample_conjunction() -> RefinedConjunction {
        let state = StateVector::new(Vector3::new(7000.0, 0.0, 0.0), Vector3::new(0.0, 7.5, 0.0));
        RefinedConjunction {
            a: "SAT-A".to_string(),
            b: "SAT-B".to_string(),
            tca: Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 45).unwrap(),
            dca_km: 1.234567,
            relative_velocity: Vector3::new(0.0, 0.0, 3.0),
            state_a: state,
            state_b: state,
            flags: vec![RefinementFlag::BoundaryTca],
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_conjunction() {
        let csv = conjunctions_to_csv(&[sample_conjunction(), sample_conjunction()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "a,b,tca_utc,dca_km,vrel_kms,flags");
        assert!(lines[1].starts_with("SAT-A,SAT-B,2026-01-01T12:30:45.000Z,1.234567,3.000000"));
        assert!(lines[1].ends_with("boundary_tca"));
    }

    #[test]
    fn json_round_trips_field_names() {
        let json = conjunctions_to_json(&[sample_conjunction()]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let record = &parsed[0];
        assert_eq!(record["a"], "SAT-A");
        assert_eq!(record["tca_utc"], "2026-01-01T12:30:45.000Z");
        assert!((record["dca_km"].as_f64().unwrap() - 1.234567).abs() < 1e-12);
        assert_eq!(record["flags"][0], "boundary_tca");
    }

    #[test]
    fn markdown_table_renders_every_row() {
        let md = conjunctions_to_markdown(&[sample_conjunction()]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("| SAT-A | SAT-B |"));
    }

    #[test]
    fn delimiters_in_object_names_are_escaped() {
        let mut conjunction = sample_conjunction();
        conjunction.a = "FENGYUN 1C DEB, FRAG \"17\"".to_string();
        conjunction.b = "COSMOS|2251 DEB".to_string();

        let csv = conjunctions_to_csv(&[conjunction.clone()]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("\"FENGYUN 1C DEB, FRAG \"\"17\"\"\",COSMOS|2251 DEB,"));
        // The quoted field keeps the column count intact.
        let mut in_quotes = false;
        let commas = row
            .chars()
            .filter(|&c| {
                if c == '"' {
                    in_quotes = !in_quotes;
                }
                c == ',' && !in_quotes
            })
            .count();
        assert_eq!(commas, 5);

        let md = conjunctions_to_markdown(&[conjunction]);
        let row = md.lines().nth(2).unwrap();
        assert!(row.contains("COSMOS\\|2251 DEB"));
        assert_eq!(row.matches(" | ").count(), 5);
    }

    #[test]
    fn suggestion_reports_include_feasibility() {
        let suggestion = DvSuggestion {
            a: "SAT-A".to_string(),
            b: "SAT-B".to_string(),
            burn_time: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            dv_kms: Vector3::new(0.0, 1e-5, 0.0),
            dv_mps: 0.01,
            projected_dca_km: 2.5,
            feasible: true,
        };
        let csv = suggestions_to_csv(&[suggestion.clone()]);
        assert!(csv.lines().nth(1).unwrap().ends_with("true"));
        let json = suggestions_to_json(&[suggestion]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["feasible"], true);
    }
}
