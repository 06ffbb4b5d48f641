use parish_ledger::*;
use std::error::Error;
use std::path::PathBuf;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) if path.ends_with(".json") => LedgerConfig::from_json_file(&path)?,
        Some(dir) => LedgerConfig::for_directory(dir),
        None => LedgerConfig::for_directory("."),
    };

    let mut viewer = match open_viewer(&config) {
        Ok(viewer) => viewer,
        Err(reason) => {
            println!("{}", reason);
            return Ok(());
        }
    };

    let tabs: Vec<String> = viewer
        .tabs()
        .iter()
        .map(|tab| {
            if tab.active {
                format!("[{}]", tab.display_label())
            } else {
                tab.display_label()
            }
        })
        .collect();
    println!("{}\n", tabs.join("  "));

    if let Some(summary) = viewer.summary() {
        for (caption, value) in summary.display_lines() {
            println!("{:<20} {}", caption, value);
        }
    }
    println!("{}\n", viewer.data_currency().unwrap_or_default());

    let types: Vec<String> = viewer
        .aggregation()
        .sorted_types()
        .iter()
        .map(|node| node.name.clone())
        .collect();
    for name in types {
        viewer.toggle(&NodePath::new([name]));
    }
    println!("{}", render_text(viewer.rows()));

    if let Some((name, contents)) = viewer.export()? {
        let out = PathBuf::from(&name);
        std::fs::write(&out, contents)?;
        println!("\nWrote {}", out.display());
    }

    Ok(())
}
