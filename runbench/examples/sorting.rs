//! Sorting benchmark driven through the runbench CLI.
//!
//! ```text
//! cargo run --example sorting -- test sorting.yml
//! ```
//!
//! with a config such as:
//!
//! ```yaml
//! test_name: sort
//! test_id: local
//! num_runs: 20
//! show_runs: false
//! len: 200000
//! ```

use runbench::prelude::*;

struct Sort {
    len: usize,
    input: Vec<u64>,
}

impl BenchmarkUnit for Sort {
    fn setup(&mut self) -> Result<(), UnitError> {
        // xorshift, deterministic across runs
        let mut x = 0x2545_f491_4f6c_dd1du64;
        self.input = (0..self.len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                x
            })
            .collect();
        Ok(())
    }

    fn execute(&mut self) -> Result<RunRecord, UnitError> {
        let mut data = self.input.clone();
        timed(|| {
            data.sort_unstable();
            Ok(RunRecord::new()
                .with("len", data.len())
                .with("min", data.first().copied().unwrap_or_default()))
        })
    }
}

fn main() -> anyhow::Result<()> {
    runbench::run_with(|config| {
        let len = config
            .params
            .get("len")
            .and_then(|v| v.as_u64())
            .unwrap_or(100_000) as usize;
        Ok(Sort {
            len,
            input: Vec::new(),
        })
    })
}
