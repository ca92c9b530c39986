use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read, File},
    io::{stdout, Write},
    path::Path,
};

use log::{error, info};

use jdeser::{
    error::warning::DecodeWarning,
    stream::{handles::HandleTable, models::Content, parser::JavaStreamReader},
};

use crate::{
    app::{
        error::RuntimeError,
        options::{ExportType, Options},
    },
    Exporter, NDJSON, TXT,
};

/// Stores the application state and handles application lifecycle
pub struct Config {
    /// App configuration options
    pub options: Options,
}

/// What happened while decoding a single source
#[derive(Debug)]
pub struct SourceReport {
    /// Size of the source in bytes
    pub length: usize,
    /// Offset the decoder stopped at
    pub position: usize,
    /// Number of top-level contents decoded before the end of the stream or the first error
    pub contents: usize,
    /// Entries left in the handle table, grouped by kind
    pub handle_kinds: BTreeMap<&'static str, usize>,
    pub warnings: Vec<DecodeWarning>,
    /// Why the source could not be fully decoded, if it could not
    pub failure: Option<RuntimeError>,
}

impl SourceReport {
    fn unreadable(why: RuntimeError) -> Self {
        Self {
            length: 0,
            position: 0,
            contents: 0,
            handle_kinds: BTreeMap::new(),
            warnings: vec![],
            failure: Some(why),
        }
    }
}

impl Config {
    /// Create a new instance of the application
    ///
    /// # Example:
    ///
    /// ```
    /// use crate::app::{
    ///    options::{from_command_line, Options},
    ///    runtime::Config,
    /// };
    ///
    /// let args = from_command_line();
    /// let options = Options::from_args(&args).unwrap();
    /// let app = Config::new(options).unwrap();
    /// ```
    pub fn new(options: Options) -> Result<Config, RuntimeError> {
        if let Some(parent) = options
            .export_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|parent| !parent.as_os_str().is_empty() && !parent.exists())
        {
            create_dir_all(parent)
                .map_err(|why| RuntimeError::CreateError(why, parent.to_path_buf()))?;
        }
        Ok(Config { options })
    }

    /// Read a whole source into memory
    pub fn read_source(path: &Path) -> Result<Vec<u8>, RuntimeError> {
        read(path).map_err(|why| RuntimeError::ReadError(why, path.to_path_buf()))
    }

    /// Get the destination for exported data
    pub fn open_output(&self) -> Result<Box<dyn Write>, RuntimeError> {
        match &self.options.export_path {
            Some(path) => {
                let file = File::create(path)
                    .map_err(|why| RuntimeError::CreateError(why, path.clone()))?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(stdout())),
        }
    }

    /// Run one decode session over a source, handing each top-level content to `on_content`
    /// while the handle table still reflects the state the content was decoded in
    ///
    /// Sources that cannot be read or decoded are reported, not returned as errors; only
    /// failures raised by `on_content` stop the caller.
    pub fn decode_source<F>(
        &self,
        path: &Path,
        mut on_content: F,
    ) -> Result<SourceReport, RuntimeError>
    where
        F: FnMut(&Content, &HandleTable) -> Result<(), RuntimeError>,
    {
        let bytes = match Config::read_source(path) {
            Ok(bytes) => bytes,
            Err(why) => {
                error!("{why}");
                return Ok(SourceReport::unreadable(why));
            }
        };

        info!("Decoding {} ({} bytes)", path.display(), bytes.len());
        let mut parser = JavaStreamReader::with_options(&bytes, self.options.decoder_options());
        let mut failure = None;
        loop {
            match parser.next_content() {
                Ok(Some(content)) => on_content(&content, parser.handles())?,
                Ok(None) => break,
                Err(why) => {
                    let why = RuntimeError::StreamError(why, path.to_path_buf());
                    error!("{why}");
                    failure = Some(why);
                    break;
                }
            }
        }

        let mut handle_kinds = BTreeMap::new();
        for (_, entry) in parser.handles().iter() {
            *handle_kinds.entry(entry.kind_name()).or_insert(0) += 1;
        }

        Ok(SourceReport {
            length: bytes.len(),
            position: parser.position(),
            contents: parser.contents().len(),
            handle_kinds,
            warnings: parser.warnings().to_vec(),
            failure,
        })
    }

    /// Print a summary of every source instead of its contents
    ///
    /// # Example:
    ///
    /// ```
    /// use crate::app::{
    ///    options::{from_command_line, Options},
    ///    runtime::Config,
    /// };
    ///
    /// let args = from_command_line();
    /// let options = Options::from_args(&args).unwrap();
    /// let app = Config::new(options).unwrap();
    /// app.run_diagnostic();
    /// ```
    pub fn run_diagnostic(&self) -> Result<usize, RuntimeError> {
        let mut failed = 0;
        println!("Java Serialization Stream Diagnostics\n");
        for path in &self.options.inputs {
            let report = self.decode_source(path, |_, _| Ok(()))?;
            println!("{}", Config::format_diagnostic(path, &report));
            if report.failure.is_some() {
                failed += 1;
            }
        }
        Ok(failed)
    }

    fn format_diagnostic(path: &Path, report: &SourceReport) -> String {
        let mut out_s = format!("{}:\n", path.display());
        out_s.push_str(&format!(
            "    Decoded {} contents from {} of {} bytes\n",
            report.contents, report.position, report.length
        ));

        let total: usize = report.handle_kinds.values().sum();
        out_s.push_str(&format!("    Handles in final table: {total}\n"));
        for (kind, count) in &report.handle_kinds {
            out_s.push_str(&format!("        {kind}: {count}\n"));
        }

        out_s.push_str(&format!("    Warnings: {}\n", report.warnings.len()));
        for warning in &report.warnings {
            out_s.push_str(&format!("        {warning}\n"));
        }

        match &report.failure {
            Some(why) => out_s.push_str(&format!("    Failed: {why}\n")),
            None => out_s.push_str("    Complete\n"),
        }
        out_s
    }

    /// Start the app given the provided set of options. This will either run
    /// diagnostic tests on the sources or export them to the specified format.
    /// Returns how many sources could not be fully decoded.
    ///
    /// # Example:
    ///
    /// ```
    /// use crate::app::{
    ///    options::{from_command_line, Options},
    ///    runtime::Config,
    /// };
    ///
    /// let args = from_command_line();
    /// let options = Options::from_args(&args).unwrap();
    /// let app = Config::new(options).unwrap();
    /// app.start();
    /// ```
    pub fn start(&self) -> Result<usize, RuntimeError> {
        if self.options.diagnostic {
            return self.run_diagnostic();
        }
        match self.options.export_type {
            ExportType::Txt => TXT::new(self)?.iter_sources(),
            ExportType::NdJson => NDJSON::new(self)?.iter_sources(),
        }
    }
}
