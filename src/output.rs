//! Terminal rendering and CSV export.
//!
//! Everything here returns strings; only the binary writes to stdout.

use anyhow::Result;
use chrono_tz::Tz;
use tracing::debug;

use crate::detail::{VehicleDetail, format_local};
use crate::stats::FleetStats;
use crate::view::{SortColumn, VehicleRow, ViewConfig, ViewPage};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

pub const EMPTY_TABLE: &str = "No vehicles found.";

/// Renders one page as an aligned text table. The active sort column carries
/// a direction arrow.
pub fn render_table(page: &ViewPage, config: &ViewConfig, columns: &[SortColumn], tz: Tz) -> String {
    if page.rows.is_empty() {
        return EMPTY_TABLE.to_string();
    }

    let mut headers: Vec<String> = columns
        .iter()
        .map(|c| {
            if *c == config.sort.column {
                format!("{} {}", c.header(), config.sort.direction.arrow())
            } else {
                c.header().to_string()
            }
        })
        .collect();
    headers.extend(["Status", "Today", "Last update"].map(String::from));

    let body: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = columns.iter().map(|c| cell(row, *c)).collect();
            cells.push(status_label(row).to_string());
            cells.push(
                row.daily_distance
                    .map(|d| format!("{d:.1}"))
                    .unwrap_or_else(|| "-".to_string()),
            );
            cells.push(
                row.last_update_at
                    .map(|at| format_local(at, tz))
                    .unwrap_or_else(|| "-".to_string()),
            );
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }
    out.push_str(&format!(
        "Page {} of {} ({} vehicles)",
        page.current_page, page.total_pages, page.total_items
    ));
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn cell(row: &VehicleRow, column: SortColumn) -> String {
    let value = match column {
        SortColumn::Name => Some(row.name.as_str()),
        SortColumn::Vin => row.vin.as_deref(),
        SortColumn::SerialNumber => row.serial_number.as_deref(),
        SortColumn::TimeZone => row.time_zone_id.as_deref(),
        SortColumn::RatePlan => row.rate_plan_name.as_deref(),
        SortColumn::LicensePlate => row.license_plate.as_deref(),
        SortColumn::DeviceType => row.device_type.as_deref(),
        SortColumn::Ignition => Some(row.ignition.as_str()),
    };
    value.unwrap_or("-").to_string()
}

fn status_label(row: &VehicleRow) -> &'static str {
    if !row.is_communicating {
        "Offline"
    } else if row.is_driving {
        "Driving"
    } else if row.is_idling {
        "Idling"
    } else {
        "Stopped"
    }
}

/// Summary cards as one block of text.
pub fn render_stats(stats: &FleetStats) -> String {
    format!(
        "Vehicles:      {}\n\
         Communicating: {} ({:.0}%)\n\
         Offline:       {}\n\
         Driving:       {}\n\
         Ignition on:   {}\n\
         Idling:        {}\n\
         Less utilized: {}",
        stats.total,
        stats.communicating,
        stats.communicating_pct(),
        stats.offline,
        stats.driving,
        stats.ignition_on,
        stats.idling,
        stats.less_utilized,
    )
}

pub fn render_detail(detail: &VehicleDetail) -> String {
    let d = &detail.device;
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        format!("{} ({})", d.name, d.id),
        format!("VIN:           {}", or_dash(&d.vin)),
        format!("Serial:        {}", or_dash(&d.serial_number)),
        format!("Plate:         {}", or_dash(&d.license_plate)),
        format!("Type:          {}", or_dash(&d.device_type)),
        format!("Rate plan:     {}", or_dash(&d.rate_plan_name)),
        format!(
            "Status:        {}",
            if detail.status.is_communicating {
                "Communicating"
            } else {
                "Not communicating"
            }
        ),
        format!("Ignition:      {}", detail.state.ignition),
        format!("Driving:       {}", yes_no(detail.state.is_driving)),
        format!("Idling:        {}", yes_no(detail.state.is_idling)),
        format!("Speed:         {}", detail.speed()),
        format!("Heading:       {}", detail.heading().as_str()),
        format!("Odometer:      {} km", detail.odometer_km()),
        format!("Location:      {}", detail.address),
    ];
    if detail.status.has_fix() {
        lines.push(format!("Coordinates:   {}", detail.coordinates()));
    }
    lines.push(format!(
        "Last update:   {}",
        detail
            .last_communicated()
            .unwrap_or_else(|| "-".to_string())
    ));
    lines.push(format!("Time zone:     {}", detail.timezone));

    lines.join("\n")
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

/// Serializes any value as pretty JSON.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Appends the rows of a page to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_rows(path: &str, rows: &[VehicleRow]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rows.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
