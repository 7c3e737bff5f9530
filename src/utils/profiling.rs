use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;

/// Accumulated timing for one named block.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProfileBlock {
    pub hit_count: u64,
    pub total_time: Duration,
}

impl ProfileBlock {
    pub fn total_time_ms(&self) -> f64 {
        self.total_time.as_secs_f64() * 1000.0
    }
}

/// Per-name timing totals gathered on the worker thread.
#[derive(Debug, Default, Clone)]
pub struct ProfileData {
    blocks: HashMap<String, ProfileBlock>,
}

impl ProfileData {
    pub fn accumulate(&mut self, name: &str, elapsed: Duration) {
        let block = self.blocks.entry(name.to_owned()).or_default();
        block.hit_count += 1;
        block.total_time += elapsed;
    }

    pub fn block(&self, name: &str) -> Option<&ProfileBlock> {
        self.blocks.get(name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
    }

    /// Human readable table of every block, cheapest first.
    pub fn report(&self) -> String {
        let mut sorted: Vec<_> = self.blocks.iter().collect();
        sorted.sort_by(|(name_a, a), (name_b, b)| {
            a.total_time
                .cmp(&b.total_time)
                .then_with(|| name_a.cmp(name_b))
        });

        let mut text = String::new();
        let _ = writeln!(text, "Num. profile blocks: {}", sorted.len());
        for (name, block) in sorted {
            let _ = writeln!(text, "---------------------------");
            let _ = writeln!(text, "Name: {name}");
            let _ = writeln!(text, "Hit Count: {}", block.hit_count);
            let _ = writeln!(text, "Total Time MS: {:.4}", block.total_time_ms());
        }
        text
    }
}
