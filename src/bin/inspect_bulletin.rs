use std::env;
use std::fs;

use climate_trends_service::bulletin::{find_header, parse_bulletin, Column};
use climate_trends_service::coordinates::extract_coordinates;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 {
        &args[1]
    } else {
        "tests/fixtures/sheffielddata.txt"
    };

    // Station ID defaults to the file stem without the "data" suffix
    let station = if args.len() > 2 {
        args[2].clone()
    } else {
        std::path::Path::new(file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches("data").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };

    println!("Opening bulletin: {file_path} (station: {station})");
    let text = fs::read_to_string(file_path)?;
    let lines: Vec<&str> = text.trim().lines().collect();

    println!("\n{}", "=".repeat(80));
    match find_header(&lines) {
        Some(index) => println!("Header at line {}: {}", index + 1, lines[index].trim()),
        None => println!("No header line found"),
    }

    match extract_coordinates(&text) {
        Some((lat, lon)) => println!("Coordinates: lat {lat}, lon {lon}"),
        None => println!("Coordinates: not found in the first lines"),
    }
    println!("{}", "=".repeat(80));

    let records = parse_bulletin(&text, &station)?;
    println!("Parsed {} records", records.len());

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!("Range: {}-{:02} to {}-{:02}", first.year, first.month, last.year, last.month);
    }

    println!("\n{:<16} {:>8} {:>10} {:>12}", "column", "missing", "estimated", "auto sensor");
    for column in Column::MEASUREMENTS {
        let mut missing = 0;
        let mut estimated = 0;
        let mut auto_sensor = 0;
        for m in records.iter().filter_map(|r| r.measurement(column)) {
            if m.is_missing() {
                missing += 1;
            }
            if m.estimated {
                estimated += 1;
            }
            if m.auto_sensor {
                auto_sensor += 1;
            }
        }
        println!(
            "{:<16} {:>8} {:>10} {:>12}",
            column.name(),
            missing,
            estimated,
            auto_sensor
        );
    }

    println!("\nFirst 5 records:");
    for record in records.iter().take(5) {
        println!(
            "  {}-{:02}  tmax {:?}  tmin {:?}  af {:?}  rain {:?}  sun {:?}",
            record.year,
            record.month,
            record.max_temp.value,
            record.min_temp.value,
            record.air_frost_days.value,
            record.rainfall.value,
            record.sunshine_hours.value
        );
    }

    Ok(())
}
