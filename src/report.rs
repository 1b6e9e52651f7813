// 📄 Distribution Report - Summary text + plan CSV
//
// The summary is a fixed-format text report:
//   title / date header
//   budget block
//   resource block (one line per resource)
//   household block (demographic counts)
//   expert notes (one paragraph per official)
//
// render() and parse() are inverses for notes without blank lines. Notes are
// written line for line; the notes block is always last.

use crate::experts::{BarangayCaptain, DistributionCouncilor, Treasurer};
use crate::registry::DistributionRegistry;
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const TITLE: &str = "BARANGAY RESOURCE DISTRIBUTION SUMMARY";
const RESOURCE_HEADING: &str = "RESOURCE SUMMARY";
const HOUSEHOLD_HEADING: &str = "HOUSEHOLD SUMMARY";
const NOTES_HEADING: &str = "EXPERT TEAM NOTES";
const DATE_FORMAT: &str = "%B %d, %Y";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("missing section: {0}")]
    MissingSection(&'static str),

    #[error("line {line}: unrecognized content '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: invalid amount '{value}'")]
    InvalidAmount { line: usize, value: String },

    #[error("line {line}: invalid date '{value}'")]
    InvalidDate { line: usize, value: String },
}

// ============================================================================
// SUMMARY MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLine {
    pub name: String,
    pub remaining: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub households: usize,
    pub children_under_five: u32,
    pub school_age: u32,
    pub elderly: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertNote {
    /// "Role (Name)"
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub date: NaiveDate,
    pub total_budget: i64,
    pub total_cost: i64,
    pub remaining_budget: i64,
    pub resources: Vec<ResourceLine>,
    pub demographics: Demographics,
    pub notes: Vec<ExpertNote>,
}

impl DistributionSummary {
    pub fn from_registry(registry: &DistributionRegistry, date: NaiveDate) -> Self {
        let total_cost = registry.total_cost();
        let profile = registry.demographics();

        let resources = registry
            .catalog
            .iter()
            .map(|r| ResourceLine {
                name: r.name.clone(),
                remaining: r.available,
                unit_price: r.cost,
            })
            .collect();

        let notes = vec![
            ExpertNote {
                author: BarangayCaptain::ROLE.label(),
                text: BarangayCaptain::note().to_string(),
            },
            ExpertNote {
                author: DistributionCouncilor::ROLE.label(),
                text: DistributionCouncilor::note().to_string(),
            },
            ExpertNote {
                author: Treasurer::ROLE.label(),
                text: Treasurer::note(total_cost, registry.budget),
            },
        ];

        DistributionSummary {
            date,
            total_budget: registry.budget,
            total_cost,
            remaining_budget: registry.budget - total_cost,
            resources,
            demographics: Demographics {
                households: registry.households.len(),
                children_under_five: profile.under_five,
                school_age: profile.school_age,
                elderly: profile.elderly,
            },
            notes,
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn parse(text: &str) -> Result<Self, ReportError> {
        SummaryParser::default().parse(text)
    }
}

impl fmt::Display for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", TITLE)?;
        writeln!(f, "{}\n", "=".repeat(60))?;

        writeln!(f, "Date: {}", self.date.format(DATE_FORMAT))?;
        writeln!(f, "Total Budget: ₱{}", format_pesos(self.total_budget))?;
        writeln!(f, "Total Cost of Allocations: ₱{}", format_pesos(self.total_cost))?;
        writeln!(f, "Remaining Budget: ₱{}\n", format_pesos(self.remaining_budget))?;

        writeln!(f, "{} (After Allocation)", RESOURCE_HEADING)?;
        writeln!(f, "{}", "-".repeat(40))?;
        for r in &self.resources {
            writeln!(
                f,
                "{}: {} units remaining at ₱{} each",
                r.name,
                r.remaining,
                format_pesos(r.unit_price)
            )?;
        }

        writeln!(f, "\n{}", HOUSEHOLD_HEADING)?;
        writeln!(f, "{}", "-".repeat(40))?;
        let d = &self.demographics;
        writeln!(f, "Total Households Processed: {}", d.households)?;
        writeln!(f, "Total Children Under 5: {}", d.children_under_five)?;
        writeln!(f, "Total School-age Children: {}", d.school_age)?;
        writeln!(f, "Total Elderly (over 60): {}\n", d.elderly)?;

        writeln!(f, "{}", NOTES_HEADING)?;
        writeln!(f, "{}", "-".repeat(60))?;
        for (i, note) in self.notes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}: {}", note.author, note.text)?;
        }
        Ok(())
    }
}

// ============================================================================
// PARSER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Resources,
    Households,
    Notes,
}

#[derive(Default)]
struct SummaryParser {
    date: Option<NaiveDate>,
    total_budget: Option<i64>,
    total_cost: Option<i64>,
    remaining_budget: Option<i64>,
    resources: Option<Vec<ResourceLine>>,
    demographics: Option<Demographics>,
    notes: Option<Vec<ExpertNote>>,
}

impl SummaryParser {
    fn parse(mut self, text: &str) -> Result<DistributionSummary, ReportError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

        // Title: first non-blank line
        let title_found = lines
            .by_ref()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(_, l)| l.trim_start().starts_with(TITLE))
            .unwrap_or(false);
        if !title_found {
            return Err(ReportError::MissingSection("title"));
        }

        let mut section = Section::Header;
        let mut paragraph: Vec<(usize, String)> = Vec::new();
        let mut notes_begun = false;

        for (number, raw) in lines {
            let line = raw.trim();

            // Notes run to the end of the report and are kept verbatim;
            // only blank lines separate them
            if section == Section::Notes {
                if line.is_empty() {
                    self.flush_note(&mut paragraph)?;
                } else if notes_begun || !is_rule(line) {
                    notes_begun = true;
                    paragraph.push((number, raw.to_string()));
                }
                continue;
            }

            if is_rule(line) {
                continue;
            }

            if let Some(next) = heading(line) {
                section = next;
                match next {
                    Section::Resources => self.resources = Some(Vec::new()),
                    Section::Households => self.demographics = Some(Demographics::default()),
                    Section::Notes => self.notes = Some(Vec::new()),
                    Section::Header => {}
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }

            match section {
                Section::Header => self.header_line(number, line)?,
                Section::Resources => self.resource_line(number, line)?,
                Section::Households => self.household_line(number, line)?,
                Section::Notes => {}
            }
        }
        self.flush_note(&mut paragraph)?;

        let (Some(date), Some(total_budget), Some(total_cost), Some(remaining_budget)) =
            (self.date, self.total_budget, self.total_cost, self.remaining_budget)
        else {
            return Err(ReportError::MissingSection("budget summary"));
        };

        Ok(DistributionSummary {
            date,
            total_budget,
            total_cost,
            remaining_budget,
            resources: self.resources.ok_or(ReportError::MissingSection("resource summary"))?,
            demographics: self
                .demographics
                .ok_or(ReportError::MissingSection("household summary"))?,
            notes: self.notes.ok_or(ReportError::MissingSection("expert team notes"))?,
        })
    }

    fn header_line(&mut self, number: usize, line: &str) -> Result<(), ReportError> {
        let (key, value) = split_field(number, line)?;
        match key {
            "Date" => {
                let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
                    ReportError::InvalidDate {
                        line: number,
                        value: value.to_string(),
                    }
                })?;
                self.date = Some(date);
            }
            "Total Budget" => self.total_budget = Some(parse_amount(number, value)?),
            "Total Cost of Allocations" => self.total_cost = Some(parse_amount(number, value)?),
            "Remaining Budget" => self.remaining_budget = Some(parse_amount(number, value)?),
            _ => return Err(malformed(number, line)),
        }
        Ok(())
    }

    /// "Food Pack: 90 units remaining at ₱500 each"
    fn resource_line(&mut self, number: usize, line: &str) -> Result<(), ReportError> {
        let (name, rest) = split_field(number, line)?;

        let (units, price) = rest
            .split_once(" units remaining at ")
            .ok_or_else(|| malformed(number, line))?;
        let price = price.strip_suffix(" each").ok_or_else(|| malformed(number, line))?;

        let remaining = parse_amount(number, units)?;
        let remaining = u32::try_from(remaining).map_err(|_| ReportError::InvalidAmount {
            line: number,
            value: units.to_string(),
        })?;

        if let Some(resources) = self.resources.as_mut() {
            resources.push(ResourceLine {
                name: name.to_string(),
                remaining,
                unit_price: parse_amount(number, price)?,
            });
        }
        Ok(())
    }

    fn household_line(&mut self, number: usize, line: &str) -> Result<(), ReportError> {
        let (key, value) = split_field(number, line)?;
        let count = parse_amount(number, value)?;
        let count_u32 = u32::try_from(count).map_err(|_| ReportError::InvalidAmount {
            line: number,
            value: value.to_string(),
        })?;

        let Some(d) = self.demographics.as_mut() else {
            return Err(malformed(number, line));
        };

        if key == "Total Households Processed" {
            d.households = count_u32 as usize;
        } else if key == "Total Children Under 5" {
            d.children_under_five = count_u32;
        } else if key == "Total School-age Children" {
            d.school_age = count_u32;
        } else if key.starts_with("Total Elderly") {
            d.elderly = count_u32;
        } else {
            return Err(malformed(number, line));
        }
        Ok(())
    }

    /// "Author: text", continuation lines joined with newlines.
    /// The text may be empty ("Author:").
    fn flush_note(&mut self, paragraph: &mut Vec<(usize, String)>) -> Result<(), ReportError> {
        if paragraph.is_empty() {
            return Ok(());
        }

        let first_line = paragraph[0].0;
        let joined = paragraph
            .drain(..)
            .map(|(_, l)| l)
            .collect::<Vec<_>>()
            .join("\n");

        let (author, text) = joined
            .split_once(':')
            .filter(|(author, _)| !author.trim().is_empty())
            .ok_or_else(|| malformed(first_line, &joined))?;
        let text = text.strip_prefix(' ').unwrap_or(text);

        if let Some(notes) = self.notes.as_mut() {
            notes.push(ExpertNote {
                author: author.trim().to_string(),
                text: text.to_string(),
            });
        }
        Ok(())
    }
}

fn heading(line: &str) -> Option<Section> {
    // Headings may carry a parenthesized suffix, e.g. "(After Allocation)"
    let base = match line.find(" (") {
        Some(idx) if line.ends_with(')') => &line[..idx],
        _ => line,
    };
    match base {
        RESOURCE_HEADING => Some(Section::Resources),
        HOUSEHOLD_HEADING => Some(Section::Households),
        NOTES_HEADING => Some(Section::Notes),
        _ => None,
    }
}

fn is_rule(line: &str) -> bool {
    !line.is_empty() && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
}

fn split_field(number: usize, line: &str) -> Result<(&str, &str), ReportError> {
    line.split_once(':')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| malformed(number, line))
}

fn malformed(number: usize, line: &str) -> ReportError {
    ReportError::MalformedLine {
        line: number,
        content: line.to_string(),
    }
}

/// "₱150,000" / "150000" / "-1,500" -> integer pesos
fn parse_amount(number: usize, value: &str) -> Result<i64, ReportError> {
    let cleaned: String = value
        .trim()
        .trim_start_matches('₱')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    cleaned.parse::<i64>().map_err(|_| ReportError::InvalidAmount {
        line: number,
        value: value.to_string(),
    })
}

/// Thousands separators: 150000 -> "150,000"
pub fn format_pesos(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// ============================================================================
// PLAN EXPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub plan_csv: PathBuf,
    pub summary_txt: PathBuf,
}

const PLAN_HEADER: [&str; 8] = [
    "Household ID",
    "Household Head",
    "Members",
    "Max Age",
    "Priority Score",
    "Resource",
    "Quantity",
    "Cost (₱)",
];

/// Write the plan CSV and the summary report, timestamped with `now`.
/// Households are listed eldest first.
pub fn export_plan(
    registry: &DistributionRegistry,
    dir: &Path,
    now: NaiveDateTime,
) -> Result<ExportPaths> {
    if registry.households.is_empty() {
        bail!("there are no households or allocations to export");
    }
    if !registry.has_plan() {
        bail!("resources have not been allocated yet, run allocation first");
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

    let stamp = now.format("%Y%m%d_%H%M%S");
    let plan_csv = dir.join(format!("distribution_plan_{}.csv", stamp));
    let summary_txt = dir.join(format!("distribution_summary_{}.txt", stamp));

    write_plan_csv(registry, &plan_csv)?;

    let summary = registry.summary(now.date());
    fs::write(&summary_txt, summary.render())
        .with_context(|| format!("Failed to write summary: {:?}", summary_txt))?;

    info!(plan = ?plan_csv, summary = ?summary_txt, "distribution plan exported");

    Ok(ExportPaths {
        plan_csv,
        summary_txt,
    })
}

fn write_plan_csv(registry: &DistributionRegistry, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create plan CSV: {:?}", path))?;
    writer.write_record(PLAN_HEADER)?;

    for household in registry.households_by_max_age() {
        let id = household.id.to_string();
        let members = household.members.to_string();
        let max_age = household
            .max_age()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let priority = household.priority_score.to_string();

        let mut written = false;
        if let Some(allocation) = registry.allocation_for(household.id) {
            for resource in registry.catalog.iter() {
                let quantity = allocation.get(&resource.name).copied().unwrap_or(0);
                if quantity == 0 {
                    continue;
                }
                let quantity_field = quantity.to_string();
                let cost_field = resource.cost_of(quantity).to_string();
                writer.write_record([
                    id.as_str(),
                    household.name.as_str(),
                    members.as_str(),
                    max_age.as_str(),
                    priority.as_str(),
                    resource.name.as_str(),
                    quantity_field.as_str(),
                    cost_field.as_str(),
                ])?;
                written = true;
            }
        }

        if !written {
            writer.write_record([
                id.as_str(),
                household.name.as_str(),
                members.as_str(),
                max_age.as_str(),
                priority.as_str(),
                "No Allocation",
                "0",
                "0",
            ])?;
        }
    }

    writer.flush().context("Failed to flush plan CSV")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::HouseholdInput;

    fn input(name: &str, ages: &[u32]) -> HouseholdInput {
        HouseholdInput {
            name: name.to_string(),
            members: ages.len() as u32,
            ages: ages.to_vec(),
        }
    }

    fn allocated_registry() -> DistributionRegistry {
        let mut registry = DistributionRegistry::default();
        registry.add_household(input("Dela Cruz", &[35, 33, 8, 3])).unwrap();
        registry.add_household(input("Santos", &[72, 70])).unwrap();
        registry.allocate().unwrap();
        registry
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
    }

    const SAMPLE: &str = "\
BARANGAY RESOURCE DISTRIBUTION SUMMARY (Sorted by Max Household Age)
============================================================

Date: June 03, 2025
Total Budget: ₱150,000
Total Cost of Allocations: ₱3,150
Remaining Budget: ₱146,850

RESOURCE SUMMARY (After Allocation)
----------------------------------------
Food Pack: 97 units remaining at ₱500 each
Hygiene Kit: 78 units remaining at ₱300 each
Medical Kit: 48 units remaining at ₱400 each
School Supplies: 69 units remaining at ₱250 each

HOUSEHOLD SUMMARY
----------------------------------------
Total Households Processed: 2
Total Children Under 5: 1
Total School-age Children: 1
Total Elderly (60+): 2

EXPERT TEAM NOTES (Allocation based on Max Household Age)
------------------------------------------------------------
Barangay Captain (Kap. Rosalie Mauricio): Resources were allocated prioritizing
households with the eldest members first.

Treas. (Weng Panganiban): The current allocation utilized a portion of the available budget for resource distribution.
";

    #[test]
    fn test_format_pesos() {
        assert_eq!(format_pesos(0), "0");
        assert_eq!(format_pesos(500), "500");
        assert_eq!(format_pesos(150_000), "150,000");
        assert_eq!(format_pesos(1_234_567), "1,234,567");
        assert_eq!(format_pesos(-1_500), "-1,500");
    }

    #[test]
    fn test_summary_from_registry() {
        let registry = allocated_registry();
        let summary = registry.summary(date());

        assert_eq!(summary.total_budget, 150_000);
        assert_eq!(summary.total_cost, 3150);
        assert_eq!(summary.remaining_budget, 146_850);
        assert_eq!(summary.resources[0].remaining, 97);
        assert_eq!(summary.demographics.households, 2);
        assert_eq!(summary.demographics.elderly, 2);
        assert_eq!(summary.notes.len(), 3);
    }

    #[test]
    fn test_render_layout() {
        let text = allocated_registry().summary(date()).render();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], TITLE);
        assert_eq!(lines[1], "=".repeat(60));
        assert_eq!(lines[3], "Date: June 03, 2025");
        assert_eq!(lines[4], "Total Budget: ₱150,000");
        assert!(text.contains("Food Pack: 97 units remaining at ₱500 each"));
        assert!(text.contains("Total Elderly (over 60): 2"));
        assert!(text.contains("Barangay Captain (Kap. Rosalie Mauricio): Resources were allocated"));
    }

    #[test]
    fn test_render_parse_round_trip() {
        let summary = allocated_registry().summary(date());
        let parsed = DistributionSummary::parse(&summary.render()).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_round_trip_preserves_note_text() {
        let mut summary = allocated_registry().summary(date());
        summary.notes = vec![
            ExpertNote {
                author: "Barangay Captain (Kap. Rosalie Mauricio)".to_string(),
                text: "line one\nline two".to_string(),
            },
            ExpertNote {
                author: "Councilor for Distribution (Kgd. Romy Colubong)".to_string(),
                text: "spaced   out  text ".to_string(),
            },
            ExpertNote {
                author: "Treas. (Weng Panganiban)".to_string(),
                text: String::new(),
            },
            ExpertNote {
                author: "Treas. (Weng Panganiban)".to_string(),
                text: "---\nRESOURCE SUMMARY".to_string(),
            },
        ];

        let parsed = DistributionSummary::parse(&summary.render()).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_parse_note_without_author_is_malformed() {
        let text = SAMPLE.replace("Treas. (Weng Panganiban): ", ": ");
        assert!(matches!(
            DistributionSummary::parse(&text),
            Err(ReportError::MalformedLine { .. })
        ));
    }

    #[test]
    fn test_parse_legacy_sample() {
        let summary = DistributionSummary::parse(SAMPLE).unwrap();

        assert_eq!(summary.date, date());
        assert_eq!(summary.total_cost, 3150);
        assert_eq!(summary.resources.len(), 4);
        assert_eq!(
            summary.resources[3],
            ResourceLine {
                name: "School Supplies".to_string(),
                remaining: 69,
                unit_price: 250,
            }
        );
        assert_eq!(summary.demographics.elderly, 2);
        assert_eq!(summary.notes.len(), 2);
        assert_eq!(summary.notes[0].author, "Barangay Captain (Kap. Rosalie Mauricio)");
        assert_eq!(
            summary.notes[0].text,
            "Resources were allocated prioritizing\nhouseholds with the eldest members first."
        );
    }

    #[test]
    fn test_parse_amount_without_separators() {
        let text = SAMPLE.replace("₱150,000", "150000");
        assert_eq!(DistributionSummary::parse(&text).unwrap().total_budget, 150_000);
    }

    #[test]
    fn test_parse_missing_budget_block() {
        let text = SAMPLE.replace("Total Budget: ₱150,000\n", "");
        assert_eq!(
            DistributionSummary::parse(&text).unwrap_err(),
            ReportError::MissingSection("budget summary")
        );
    }

    #[test]
    fn test_parse_missing_title() {
        assert_eq!(
            DistributionSummary::parse("Date: June 03, 2025\n").unwrap_err(),
            ReportError::MissingSection("title")
        );
    }

    #[test]
    fn test_parse_invalid_amount() {
        let text = SAMPLE.replace("₱3,150", "₱3,1x0");
        assert_eq!(
            DistributionSummary::parse(&text).unwrap_err(),
            ReportError::InvalidAmount {
                line: 6,
                value: "₱3,1x0".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed_resource_line() {
        let text = SAMPLE.replace("Medical Kit: 48 units remaining at ₱400 each", "Medical Kit: lots");
        assert!(matches!(
            DistributionSummary::parse(&text),
            Err(ReportError::MalformedLine { line: 13, .. })
        ));
    }

    #[test]
    fn test_export_plan_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = allocated_registry();
        registry.add_household(input("Reyes", &[28])).unwrap();

        let now = date().and_hms_opt(14, 5, 9).unwrap();
        let paths = export_plan(&registry, dir.path(), now).unwrap();

        assert!(paths.plan_csv.ends_with("distribution_plan_20250603_140509.csv"));
        assert!(paths.summary_txt.ends_with("distribution_summary_20250603_140509.txt"));

        let mut reader = csv::Reader::from_path(&paths.plan_csv).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), PLAN_HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // Santos (eldest) first: food, hygiene, medical
        assert_eq!(&rows[0][1], "Santos");
        assert_eq!(&rows[0][3], "72");
        // Reyes was added after allocation
        let last = rows.last().unwrap();
        assert_eq!(&last[1], "Reyes");
        assert_eq!(&last[5], "No Allocation");
        assert_eq!(rows.len(), 3 + 4 + 1);

        let text = fs::read_to_string(&paths.summary_txt).unwrap();
        assert!(DistributionSummary::parse(&text).is_ok());
    }

    #[test]
    fn test_export_refuses_without_plan() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DistributionRegistry::default();
        let now = date().and_hms_opt(9, 0, 0).unwrap();

        assert!(export_plan(&registry, dir.path(), now).is_err());

        registry.add_household(input("Reyes", &[28])).unwrap();
        let err = export_plan(&registry, dir.path(), now).unwrap_err();
        assert!(err.to_string().contains("not been allocated"));
    }
}
