//! Shipping statistics.

use dispatcher::MetricsSnapshot;

/// Counters of one `run`
#[derive(Debug, Clone, Default)]
pub struct ShipStats {
    /// Lines read from the input
    pub lines: u64,
    /// Events accepted by the router
    pub posted: u64,
    /// Empty lines
    pub blank: u64,
    /// Lines that were not JSON objects with a kind
    pub invalid: u64,
    /// Events with a kind no output or filter mentions
    pub rejected: u64,
}

impl ShipStats {
    /// Print summary, with per-output counters
    pub fn print_summary(&self, outputs: &[(String, MetricsSnapshot)]) {
        println!("\n=== Shipping Summary ===\n");
        println!("Input");
        println!("   ├─ Lines read: {}", self.lines);
        println!("   ├─ Posted: {}", self.posted);
        println!("   ├─ Blank: {}", self.blank);
        println!("   ├─ Invalid: {}", self.invalid);
        println!("   └─ Unknown kind: {}", self.rejected);

        if !outputs.is_empty() {
            println!("\nBuffered outputs ({})", outputs.len());
            for (i, (name, m)) in outputs.iter().enumerate() {
                let prefix = if i == outputs.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: enqueued {}, flushed {}, failed flushes {}, purged {}, store failures {}",
                    prefix,
                    name,
                    m.enqueued_count,
                    m.flushed_count,
                    m.failure_count,
                    m.purged_count,
                    m.store_failure_count
                );
            }
        }

        println!();
    }
}
