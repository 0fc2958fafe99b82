//! Colored terminal output for distribution commands.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn styled(&self, glyph: &str, color: Color, bold_glyph: bool, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold_glyph));
        let _ = write!(&mut buffer, "{glyph}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {message}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        self.styled("ℹ", Color::Cyan, false, message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.styled("✓", Color::Green, true, message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.styled("⚠", Color::Yellow, true, message);
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) {
        self.styled("⋯", Color::Magenta, false, message);
    }

    /// Print a verbose message (only with `--verbose`)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            self.styled("→", Color::Blue, false, message);
        }
    }

    /// Print an error message to stderr (shown even in quiet mode)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        let written = buffer
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))
            .and_then(|()| write!(&mut buffer, "✗"))
            .and_then(|()| buffer.reset())
            .and_then(|()| writeln!(&mut buffer, " {message}"))
            .and_then(|()| bufwtr.print(&buffer));

        if written.is_err() {
            println!("✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {title} ═══");
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        self.println(&format!("    {message}"));
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{message}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print machine-readable output; never suppressed
    pub fn data(&self, payload: &str) {
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{payload}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
