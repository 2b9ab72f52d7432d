// Interactive shell over a navigation session

use fatkit_formatters::{FatNavigator, FileContents};
use std::io::{BufRead, Read, Seek, Write};
use tracing::warn;

pub const HELP: &str = "Commands: dir, cd, type, exit";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Empty,
    Dir,
    Cd(Option<&'a str>),
    Type(Option<&'a str>),
    Exit,
    Unknown,
}

impl<'a> ShellCommand<'a> {
    fn parse(line: &'a str) -> Self {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return ShellCommand::Empty;
        };
        match command {
            "dir" => ShellCommand::Dir,
            "cd" => ShellCommand::Cd(words.next()),
            "type" => ShellCommand::Type(words.next()),
            "exit" | "quit" => ShellCommand::Exit,
            _ => ShellCommand::Unknown,
        }
    }
}

/// Read commands from `input` until `exit`/`quit` or end of input.
///
/// Errors from a single command (a corrupt chain, say) are reported and the
/// session carries on; only failures to write the output end it.
pub fn run_shell<R, I, O>(nav: &mut FatNavigator<R>, mut input: I, output: &mut O) -> anyhow::Result<()>
where
    R: Read + Seek,
    I: BufRead,
    O: Write,
{
    let mut raw = Vec::new();
    loop {
        write!(output, "{}> ", nav.current_path())?;
        output.flush()?;

        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            writeln!(output)?;
            return Ok(());
        }
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Ignoring input line: {}", e);
                writeln!(output, "Error: input is not valid UTF-8: {:?}", String::from_utf8_lossy(&raw).trim_end())?;
                continue;
            }
        };

        let result: anyhow::Result<()> = match ShellCommand::parse(line) {
            ShellCommand::Empty | ShellCommand::Cd(None) | ShellCommand::Type(None) => Ok(()),
            ShellCommand::Exit => return Ok(()),
            ShellCommand::Dir => dir(nav, output),
            ShellCommand::Cd(Some(name)) => nav.change_dir(name).map(|_| ()).map_err(Into::into),
            ShellCommand::Type(Some(name)) => type_file(nav, name, output),
            ShellCommand::Unknown => writeln!(output, "{}", HELP).map_err(Into::into),
        };

        if let Err(e) = result {
            warn!("Command failed: {:#}", e);
            writeln!(output, "Error: {:#}", e)?;
        }
    }
}

fn dir<R: Read + Seek, O: Write>(nav: &mut FatNavigator<R>, output: &mut O) -> anyhow::Result<()> {
    for entry in nav.list()? {
        if entry.is_directory() {
            writeln!(output, "{:12} <DIR>", entry.name)?;
        } else {
            writeln!(output, "{:12} {} bytes", entry.name, entry.size)?;
        }
    }
    Ok(())
}

fn type_file<R: Read + Seek, O: Write>(nav: &mut FatNavigator<R>, name: &str, output: &mut O) -> anyhow::Result<()> {
    match nav.read_file(name)? {
        Some(FileContents::Text(text)) => writeln!(output, "{}", text)?,
        Some(FileContents::Binary(data)) => writeln!(output, "{}", data.escape_ascii())?,
        None => {}
    }
    Ok(())
}
