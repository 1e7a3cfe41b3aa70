use std::io::{self, BufWriter, Write};

use scout_common::network::range::RangeSpec;
use tracing::error;

pub fn expand(ranges: &[String]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let failed = write_expansion(ranges, &mut out)?;
    out.flush()?;

    if failed > 0 {
        anyhow::bail!("{failed} of {} ranges could not be parsed", ranges.len());
    }
    Ok(())
}

/// Writes one address per line and returns how many ranges were rejected.
fn write_expansion<W: Write>(ranges: &[String], out: &mut W) -> io::Result<usize> {
    let mut failed = 0;
    for raw in ranges {
        match raw.parse::<RangeSpec>() {
            Ok(spec) => {
                for addr in spec.addresses() {
                    writeln!(out, "{addr}")?;
                }
            }
            Err(e) => {
                error!("{e}");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
