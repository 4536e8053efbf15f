//! Console rendering of scan reports and status signals

use colored::Colorize;
use tagscan_classic::{
    AuthOutcome, BlockRecord, KeyCatalog, ScanReport, Sector, StatusEvent,
    sector::SECTOR_COUNT_1K,
};

/// Status-indicator collaborator: one short line per state change
pub(crate) fn indicate(event: StatusEvent) {
    match event {
        StatusEvent::Waiting => println!("{}", "waiting for card...".dimmed()),
        StatusEvent::Scanning => println!("{}", "card detected, scanning...".yellow()),
        StatusEvent::HardwareFault => eprintln!("{}", "reader hardware fault".red().bold()),
        // per-sector outcomes show up in the report
        StatusEvent::SectorSuccess(_) | StatusEvent::SectorDenied(_) => {}
    }
}

/// Print a full scan report
pub(crate) fn print_report(report: &ScanReport) {
    let identity = &report.identity;

    println!();
    println!("UID:  {}", identity.uid.to_string().bold());
    print!("SAK:  {:#04x}", identity.sak);
    if identity.looks_ndef_formatted() {
        println!(" {}", "(NDEF formatted)".green());
    } else {
        println!();
    }
    println!("Type: {}", identity.card_type());

    for entry in &report.sectors {
        let sector = entry.sector;
        let heading = format!(
            "sector {:2} (blocks {:2}-{:2})",
            sector.index(),
            sector.first_block(),
            sector.trailer_block(),
        );
        match &entry.outcome {
            AuthOutcome::Granted(candidate) => {
                println!(
                    "{}  {}",
                    heading,
                    format!("opened with {candidate}").green()
                );
            }
            AuthOutcome::Denied => {
                println!("{}  {}", heading, "no access".red());
                continue;
            }
        }

        for record in &entry.blocks {
            match record {
                BlockRecord::Read(content) => {
                    println!(
                        "  blk {:2}  {}  {}",
                        content.block(),
                        content.hex(),
                        format!("\"{}\"", content.printable()).dimmed()
                    );
                }
                BlockRecord::Unreadable { block, error } => {
                    println!("  blk {:2}  {}", block, format!("read failed: {error}").red());
                }
            }
        }

        if let Some(tlv) = &entry.ndef {
            match tlv.length {
                Some(length) => println!(
                    "  {}",
                    format!("NDEF TLV found, length {length} bytes").cyan()
                ),
                None => println!("  {}", "NDEF TLV found, empty message".cyan()),
            }
        }
    }

    let granted = report.granted().count();
    let denied = report.denied().count();
    let total = report.sectors.len();
    let mut summary = format!("{granted}/{total} sectors opened");
    if denied > 0 {
        summary.push_str(&format!(", {denied} denied"));
    }
    println!("{}", summary.bold());
}

/// Print the key catalog tiers for both sector classes
pub(crate) fn print_catalog() {
    let catalog = KeyCatalog::standard();

    println!("sector 0 (MAD):");
    for candidate in catalog.candidates(Sector::new(0)) {
        println!("  {}  {}", candidate.key(), candidate);
    }

    println!("sectors 1-{}:", SECTOR_COUNT_1K - 1);
    for candidate in catalog.candidates(Sector::new(1)) {
        println!("  {}  {}", candidate.key(), candidate);
    }
}
