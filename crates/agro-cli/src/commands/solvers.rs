use std::io::{self, Write};

use agro_algo::SolverDispatcher;
use anyhow::Result;
use tabwriter::TabWriter;

pub fn handle() -> Result<()> {
    let dispatcher = SolverDispatcher::new();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SOLVER\tCLASS\tNATIVE\tDESCRIPTION")?;
    for backend in dispatcher.list_available() {
        writeln!(
            writer,
            "{}\t{:?}\t{}\t{}",
            backend.display_name(),
            backend.problem_class(),
            if backend.is_native() { "yes" } else { "no" },
            backend.description(),
        )?;
    }
    writer.flush()?;
    Ok(())
}
