// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Output file layout and the summary table.
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use snipstream_core::report::{write_occurrences, write_ranked};
use snipstream_core::{MinerConfig, Timestamp};
use tracing::info;

use crate::Args;

/// Which scorer produced the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Online,
    Offline,
    DataStream,
}

impl Mode {
    fn dir(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline | Self::DataStream => "offline",
        }
    }
}

/// `<output-dir>/<online|offline>/<view>/<prefix>_<suffix>.txt`.
#[derive(Debug)]
pub(crate) struct OutputPaths {
    dir: PathBuf,
    prefix: String,
}

impl OutputPaths {
    pub(crate) fn new(args: &Args, config: &MinerConfig, mode: Mode) -> Self {
        let stream = stream_name(&args.stream);
        let mut prefix = format!(
            "{stream}_window_size_{}_max_size_{}",
            config.window_size, config.max_snippet_size
        );
        if mode != Mode::DataStream {
            prefix = format!(
                "{prefix}_exps_{}_{}_{}",
                config.alpha, config.beta, config.gamma
            );
        }
        Self {
            dir: args.output_dir.join(mode.dir()).join(config.view.as_str()),
            prefix,
        }
    }

    pub(crate) fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{suffix}.txt", self.prefix))
    }

    pub(crate) fn write_ranked<V: Display>(&self, suffix: &str, ranked: &[(String, V)]) -> Result<()> {
        self.write(suffix, |out| write_ranked(out, ranked))
    }

    pub(crate) fn write_occurrences<'a, I>(&self, occurrences: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [Timestamp])>,
    {
        self.write("occs", |out| write_occurrences(out, occurrences))
    }

    fn write<F>(&self, suffix: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir {}", self.dir.display()))?;
        let path = self.path(suffix);
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        body(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "output saved");
        Ok(())
    }
}

/// File stem of the stream path, or the whole file name without one.
fn stream_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map_or_else(|| "stream".to_owned(), |name| name.to_string_lossy().into_owned())
}

/// The `top` best entries as a table.
pub(crate) fn top_table<V: Display>(ranked: &[(String, V)], top: usize, value: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "snippet", value]);
    for (rank, (key, score)) in ranked.iter().take(top).enumerate() {
        table.add_row(vec![(rank + 1).to_string(), key.clone(), score.to_string()]);
    }
    table
}
