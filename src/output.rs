//! JSON export of parsed alignments.

use crate::error::Result;
use crate::xmfa::Lcb;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Serializes blocks as a JSON array of arrays, indented by four spaces.
pub fn to_json_string(lcbs: &[Lcb]) -> Result<String> {
    let mut buf = Vec::new();
    write_json(&mut buf, lcbs)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes blocks as indented JSON to `writer`.
pub fn write_json<W: Write>(writer: W, lcbs: &[Lcb]) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(writer, formatter);
    lcbs.serialize(&mut ser)?;
    Ok(())
}

/// Writes blocks to `path`, replacing it only once the document is complete.
pub fn write_json_file(path: &Path, lcbs: &[Lcb]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    info!(path = %path.display(), lcbs = lcbs.len(), "writing alignment JSON");

    let tmp = tempfile::Builder::new()
        .prefix(".alignment_")
        .suffix(".json")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write_json(&mut writer, lcbs)?;
        writer.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}

/// `alignment.xmfa` becomes `alignment.json`; other names get `.json` appended.
pub fn json_path_for(xmfa_path: &Path) -> PathBuf {
    match xmfa_path.extension() {
        Some(ext) if ext == "xmfa" => xmfa_path.with_extension("json"),
        _ => {
            let mut s = xmfa_path.as_os_str().to_owned();
            s.push(".json");
            PathBuf::from(s)
        }
    }
}
