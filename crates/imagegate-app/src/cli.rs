// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments for the `imagegate` binary.

use std::path::{Path, PathBuf};

use clap::Parser;
use imagegate_core::error::{GateError, Result};
use imagegate_core::{Dimensions, ImageKind, Upload};

/// MIME type used when neither `--mime` nor the extension names one.
const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Parser, Debug)]
#[command(name = "imagegate")]
#[command(about = "Check a batch of uploaded images in order and stop at the first rejection")]
#[command(
    after_help = "Rejected files are deleted; oversized files are resized in place.\n\
                  Exit status: 0 proceed, 1 rejected, 2 error."
)]
pub struct Cli {
    /// JSON admission settings; built-in defaults apply when omitted
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Evaluate uploads in parallel. The reported rejection is still the
    /// first failing slot in input order
    #[arg(long)]
    pub concurrent: bool,

    /// MIME type declared for a slot, instead of the one implied by its extension
    #[arg(long = "mime", value_name = "SLOT=MIME", value_parser = parse_slot_mime)]
    pub mime: Vec<(String, String)>,

    /// Dimensions the client reported for a slot
    #[arg(long = "declared", value_name = "SLOT=WxH", value_parser = parse_slot_dimensions)]
    pub declared: Vec<(String, Dimensions)>,

    /// Uploads in request order
    #[arg(value_name = "SLOT=PATH", value_parser = parse_slot_path)]
    pub uploads: Vec<SlotPath>,
}

/// One positional `SLOT=PATH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPath {
    pub slot: String,
    pub path: String,
}

impl Cli {
    /// Build the batch, applying `--mime` and `--declared` to their slots.
    pub fn batch(&self) -> Result<Vec<Upload>> {
        for slot in self
            .mime
            .iter()
            .map(|(slot, _)| slot)
            .chain(self.declared.iter().map(|(slot, _)| slot))
        {
            if !self.uploads.iter().any(|u| &u.slot == slot) {
                return Err(GateError::Config(format!("no upload for slot {slot}")));
            }
        }

        Ok(self
            .uploads
            .iter()
            .map(|SlotPath { slot, path }| {
                let mime = match self.mime.iter().find(|(s, _)| s == slot) {
                    Some((_, mime)) => mime.clone(),
                    None => mime_from_path(Path::new(path)),
                };
                let upload = Upload::new(slot.as_str(), mime, path.as_str());
                match self.declared.iter().find(|(s, _)| s == slot) {
                    Some((_, dims)) => upload.with_declared(*dims),
                    None => upload,
                }
            })
            .collect())
    }
}

fn split_slot<'a>(arg: &'a str, what: &str) -> std::result::Result<(&'a str, &'a str), String> {
    let (slot, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT={what}, got '{arg}'"))?;
    if slot.is_empty() {
        return Err(format!("missing slot name in '{arg}'"));
    }
    if value.is_empty() {
        return Err(format!("missing {what} for slot {slot}"));
    }
    Ok((slot, value))
}

pub fn parse_slot_path(arg: &str) -> std::result::Result<SlotPath, String> {
    let (slot, path) = split_slot(arg, "PATH")?;
    Ok(SlotPath {
        slot: slot.to_owned(),
        path: path.to_owned(),
    })
}

/// `SLOT=type/subtype`, optionally with `;` parameters.
pub fn parse_slot_mime(arg: &str) -> std::result::Result<(String, String), String> {
    let (slot, mime) = split_slot(arg, "MIME")?;
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let well_formed = matches!(
        essence.split_once('/'),
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() && !sub.contains('/')
    ) && !essence.contains(char::is_whitespace);
    if !well_formed {
        return Err(format!("'{mime}' is not a MIME type"));
    }
    Ok((slot.to_owned(), mime.to_owned()))
}

/// `SLOT=WxH`, both sides positive.
pub fn parse_slot_dimensions(arg: &str) -> std::result::Result<(String, Dimensions), String> {
    let (slot, size) = split_slot(arg, "WxH")?;
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{size}'"))?;
    let parse = |v: &str| {
        v.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid dimension '{v}' in '{size}'"))
    };
    Ok((slot.to_owned(), Dimensions::new(parse(w)?, parse(h)?)))
}

fn mime_from_path(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageKind::from_extension)
        .map_or(UNKNOWN_MIME, |kind| kind.mime_type())
        .to_owned()
}
