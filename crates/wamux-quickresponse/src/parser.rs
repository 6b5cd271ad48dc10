// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-based parser for quick-response reports.

use chrono::{DateTime, Utc};

use crate::model::{ActivityInfo, OfficerInfo, OutputInfo, QuickResponse};

const OFFICER_HEADING: &str = "Data Petugas";
const ACTIVITY_HEADING: &str = "Identifikasi Kegiatan Q.R";
const OUTPUT_HEADING: &str = "Output Kegiatan QR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Officer,
    Activity,
    Output,
}

/// Whether `content` carries a report at all.
pub fn looks_like_report(content: &str) -> bool {
    content.contains(OFFICER_HEADING)
}

/// Parses a report. Lines before the first heading, lines without a `:`,
/// and unknown keys are ignored.
pub fn parse_report(
    content: &str,
    device_name: &str,
    sender: &str,
    received_at: DateTime<Utc>,
) -> QuickResponse {
    let mut officer = OfficerInfo::default();
    let mut activity = ActivityInfo::default();
    let mut output = OutputInfo::default();
    let mut section = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line {
            OFFICER_HEADING => section = Some(Section::Officer),
            ACTIVITY_HEADING => section = Some(Section::Activity),
            OUTPUT_HEADING => section = Some(Section::Output),
            _ => {
                let (Some(section), Some((key, value))) = (section, line.split_once(':')) else {
                    continue;
                };
                let (key, value) = (key.trim(), value.trim().to_string());
                match section {
                    Section::Officer => officer_field(&mut officer, key, value),
                    Section::Activity => activity_field(&mut activity, key, value),
                    Section::Output => output_field(&mut output, key, value),
                }
            }
        }
    }

    QuickResponse {
        id: uuid::Uuid::new_v4().to_string(),
        device_name: device_name.to_string(),
        sender: sender.to_string(),
        officer,
        activity,
        output,
        created_at: received_at,
    }
}

/// A report needs at least one officer field.
pub fn is_valid(report: &QuickResponse) -> bool {
    !report.officer.is_empty()
}

fn officer_field(officer: &mut OfficerInfo, key: &str, value: String) {
    match key {
        "Nama" => officer.name = value,
        "Jabatan" => officer.position = value,
        "D.I Penugasan" => officer.assignment = value,
        _ => {}
    }
}

fn activity_field(activity: &mut ActivityInfo, key: &str, value: String) {
    match key {
        "Metode Penugasan" => activity.method = value,
        "Kegiatan Quick Respons" => activity.activity_type = value,
        "D.I Quick Respons" => activity.irrigation_area = value,
        "Saluran Quick Respons" => activity.channel = value,
        "Ruas Bangunan Quick Respons" => activity.building_route = value,
        "Desa / Kecamatan / Kabupaten Quick Respons" => activity.location = value,
        "UPT PSDA WS" => activity.watershed_unit = value,
        _ => {}
    }
}

fn output_field(output: &mut OutputInfo, key: &str, value: String) {
    match key {
        "Luas Area Kegiatan" => output.area_size = value,
        "Panjang Saluran" => output.channel_length = value,
        "Menutup Bocoran" => output.leaks_closed = value,
        "Angkat Sedimen" => output.sediment_removed = value,
        "Pembersihan Sampah" => output.trash_cleared = value,
        "Angkat / Potong Pohon" => output.trees_removed = value,
        _ => {}
    }
}
