use std::fs;
use std::path::Path;
use csv::Writer;

use crate::errors::Result;
use crate::history::OperationLog;
use crate::regions::{Property, PropertyTable};

/// Write one row per region: label followed by every property column.
/// Undefined metrics are left as empty cells.
pub fn write_properties_csv<P: AsRef<Path>>(table: &PropertyTable, path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;

    let mut header = vec!["label"];
    header.extend(table.columns().iter().map(|p| p.name()));
    writer.write_record(&header)?;

    for row in table.iter() {
        let mut record = vec![row.label.to_string()];
        for &property in table.columns() {
            record.push(format_value(property, row.value(property)));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(())
}

fn format_value(property: Property, value: Option<f64>) -> String {
    match (property, value) {
        (_, None) => String::new(),
        (Property::Area | Property::ConvexArea, Some(v)) => format!("{}", v as u64),
        (_, Some(v)) => format!("{:.6}", v),
    }
}

/// Write the operation history, one description per line
pub fn write_history<P: AsRef<Path>>(log: &OperationLog, path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut content = String::new();
    for description in log.descriptions() {
        content.push_str(&description);
        content.push('\n');
    }
    fs::write(path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::{extract_regions, ExtractionConfig};
    use crate::transforms::Operation;
    use image::{GrayImage, Luma};

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("bubble_kicker_out_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_header_and_rows() {
        // A 3x3 block and a single pixel
        let mask = GrayImage::from_fn(8, 8, |x, y| {
            let block = x < 3 && y < 3;
            Luma([if block || (x, y) == (6, 6) { 0 } else { 255 }])
        });
        let regions = extract_regions(&mask, &ExtractionConfig::default()).unwrap();

        let dir = scratch_dir("csv");
        let path = dir.join("props.csv");
        write_properties_csv(regions.table(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("label,area,perimeter,"));
        assert!(lines[1].starts_with("1,9,"));
        // Undefined convexity and circularity for the single pixel
        assert!(lines[2].starts_with("2,1,"));
        assert!(lines[2].ends_with(",,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn writes_history_lines() {
        let mut log = OperationLog::new();
        log.push(Operation::Dilate { footprint: 3 });
        log.push(Operation::FillHoles);

        let dir = scratch_dir("history");
        let path = dir.join("history.txt");
        write_history(&log, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "dilate(footprint=3)\nfill_holes()\n"
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
