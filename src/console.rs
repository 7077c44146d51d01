use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::coordinator::OutputSink;
use crate::error::SinkError;
use crate::message::{ErrorRecord, OutputObject};
use crate::models::{ArchiveEntry, ArchiveInformation};
use crate::progress::ProgressState;
use crate::utils::get_formatted_size;

const PB_STYLE: &str = "{spinner:.blue} {prefix:.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

/// Terminal sink: a progress bar on stderr, results on stdout.
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
    bar: Option<ProgressBar>,
    finished: bool,
    verbose: bool,
    json: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self::with_writer(io::stdout(), verbose, json)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn with_writer(out: W, verbose: bool, json: bool) -> Self {
        Self {
            out,
            bar: None,
            finished: false,
            verbose,
            json,
        }
    }

    fn bar_for(&mut self, progress: &ProgressState) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
                bar.set_style(style.tick_chars(TICK).progress_chars(PB_CHARS));
            }
            bar.set_prefix(progress.activity.clone());
            bar
        })
    }

    /// Runs `f` with the progress bar cleared so its output is not torn.
    fn above_bar<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    fn print_entry(&mut self, entry: &ArchiveEntry) -> io::Result<()> {
        let kind = if entry.is_directory { 'D' } else { '-' };
        let lock = if entry.encrypted { '*' } else { ' ' };
        writeln!(
            self.out,
            "{kind}{lock} {:>10} {:>10} {:<10} {}",
            get_formatted_size(entry.size),
            get_formatted_size(entry.packed_size),
            entry.method,
            entry.file_name
        )
    }

    fn print_information(&mut self, info: &ArchiveInformation) -> io::Result<()> {
        writeln!(self.out, "Archive:  {}", info.full_path.display())?;
        writeln!(self.out, "Format:   {:?}", info.format)?;
        if let Some(method) = &info.method {
            writeln!(self.out, "Method:   {method}")?;
        }
        writeln!(self.out, "Files:    {}", info.files_count)?;
        writeln!(self.out, "Packed:   {}", get_formatted_size(info.packed_size))?;
        writeln!(self.out, "Unpacked: {}", get_formatted_size(info.unpacked_size))?;
        for name in &info.files {
            writeln!(self.out, "  {name}")?;
        }
        Ok(())
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn write_progress(&mut self, progress: &ProgressState) -> Result<(), SinkError> {
        if progress.is_completed() {
            // A finished bar has been torn down; anything else is still drawable.
            if self.finished {
                return Err(SinkError::Detached);
            }
            self.bar_for(progress);
            let bar = self.bar.take().ok_or(SinkError::Detached)?;
            bar.set_prefix(progress.activity.clone());
            bar.set_position(progress.percent().into());
            bar.finish_with_message(progress.status.clone());
            self.finished = true;
            return Ok(());
        }

        let bar = self.bar_for(progress);
        bar.set_prefix(progress.activity.clone());
        bar.set_message(progress.status.clone());
        bar.set_position(progress.percent().into());
        Ok(())
    }

    fn write_verbose(&mut self, line: &str) -> Result<(), SinkError> {
        if self.verbose {
            self.above_bar(|| eprintln!("VERBOSE: {line}"));
        }
        Ok(())
    }

    fn write_error(&mut self, record: &ErrorRecord) -> Result<(), SinkError> {
        self.above_bar(|| match &record.target {
            Some(target) => eprintln!("ERROR: {} [{}]", record, target.display()),
            None => eprintln!("ERROR: {record}"),
        });
        Ok(())
    }

    fn write_object(&mut self, object: &OutputObject) -> Result<(), SinkError> {
        if self.json {
            serde_json::to_writer(&mut self.out, object)?;
            writeln!(self.out)?;
        } else {
            match object {
                OutputObject::Entry(entry) => self.print_entry(entry)?,
                OutputObject::Information(info) => self.print_information(info)?,
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
