//! Codec Families
//!
//! Command-line conventions of the wrapped lossless encoders. A
//! [`CodecConfiguration`] (family + option string, as read from the config
//! file) is turned into a boxed [`CommandCodec`] with [`CodecConfiguration::build`].
//!
//! | family          | quirk                                              |
//! |-----------------|----------------------------------------------------|
//! | `monkeys-audio` | decoder only accepts `.ape` input                  |
//! | `mpeg4-als`     | reference encoder runs under `wine64` off Windows  |
//! | `tak`           | output forced to `.tak`, decoder needs `.tak`      |
//! | `halac`         | output forced to `.halac`, decoder needs `.halac`  |
//! | `template`      | user-defined commands and extension quirks         |

use crate::codec::{
    CommandCodec, Label, reclaim_forced_extension, relocate_with_extension, with_extensions,
};
use crate::error::CodecError;
use crate::process::Invocation;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// HALAC is still in development, so its version is pinned into label and
/// executable names.
pub const HALAC_VERSION: &str = "V.0.3.8";

/// Known codec families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecFamily {
    /// Free Lossless Audio Codec
    Flac,
    /// WavPack
    Wavpack,
    /// True Audio
    Tta,
    /// Monkey's Audio
    MonkeysAudio,
    /// MPEG-4 Audio Lossless Coding reference software
    #[serde(rename = "mpeg4-als")]
    Mpeg4Als,
    /// Tom's lossless Audio Kompressor
    Tak,
    /// HALAC
    Halac,
    /// NARU
    Naru,
    /// LINNE
    Linne,
    /// SRLA
    Srla,
    /// User-defined command templates
    Template,
}

/// One benchmarking subject: a codec family plus its option string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfiguration {
    /// Codec family
    pub family: CodecFamily,
    /// Options passed verbatim (split on whitespace) to the tool
    #[serde(default)]
    pub options: String,
    /// Command templates, required for [`CodecFamily::Template`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<CommandTemplate>,
}

impl CodecConfiguration {
    /// Configuration for a built-in family
    pub fn new(family: CodecFamily, options: impl Into<String>) -> Self {
        Self {
            family,
            options: options.into(),
            template: None,
        }
    }

    /// Configuration for a user-defined codec
    pub fn with_template(template: CommandTemplate, options: impl Into<String>) -> Self {
        Self {
            family: CodecFamily::Template,
            options: options.into(),
            template: Some(template),
        }
    }

    /// Instantiate the command description for this configuration
    pub fn build(&self) -> Result<Box<dyn CommandCodec>, CodecError> {
        let options = self.options.clone();
        if self.family != CodecFamily::Template && self.template.is_some() {
            return Err(CodecError::InvalidConfiguration(format!(
                "{:?} does not accept a command template",
                self.family
            )));
        }

        let codec: Box<dyn CommandCodec> = match self.family {
            CodecFamily::Flac => Box::new(Flac { options }),
            CodecFamily::Wavpack => Box::new(WavPack { options }),
            CodecFamily::Tta => {
                if !options.trim().is_empty() {
                    return Err(CodecError::InvalidConfiguration(format!(
                        "TTA takes no options, got \"{}\"",
                        options.trim()
                    )));
                }
                Box::new(Tta)
            }
            CodecFamily::MonkeysAudio => Box::new(MonkeysAudio { options }),
            CodecFamily::Mpeg4Als => Box::new(Mpeg4Als { options }),
            CodecFamily::Tak => Box::new(Tak { options }),
            CodecFamily::Halac => Box::new(Halac::new(options)),
            CodecFamily::Naru => Box::new(ModeFlagCodec::new("NARU", "naru", options)),
            CodecFamily::Linne => Box::new(ModeFlagCodec::new("LINNE", "linne", options)),
            CodecFamily::Srla => Box::new(ModeFlagCodec::new("SRLA", "srla", options)),
            CodecFamily::Template => {
                let template = self.template.clone().ok_or_else(|| {
                    CodecError::InvalidConfiguration(
                        "family \"template\" requires a [codecs.template] table".to_string(),
                    )
                })?;
                template.validate()?;
                Box::new(TemplateCodec { template, options })
            }
        };
        Ok(codec)
    }

    /// Label of this configuration
    pub fn label(&self) -> Result<Label, CodecError> {
        Ok(self.build()?.label())
    }
}

/// FLAC reference encoder
#[derive(Debug, Clone)]
pub struct Flac {
    options: String,
}

impl CommandCodec for Flac {
    fn family(&self) -> &str {
        "FLAC"
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("flac")
            .options(&self.options)
            .args(["-f", "-s", "-o"])
            .arg(output)
            .arg(input)
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("flac")
            .args(["-d", "-f", "-s", "-o"])
            .arg(output)
            .arg(input)
    }
}

/// WavPack (`wavpack` / `wvunpack`)
#[derive(Debug, Clone)]
pub struct WavPack {
    options: String,
}

impl CommandCodec for WavPack {
    fn family(&self) -> &str {
        "WavPack"
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("wavpack")
            .options(&self.options)
            .args(["-q", "-y"])
            .arg(input)
            .arg("-o")
            .arg(output)
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("wvunpack")
            .arg(input)
            .args(["-q", "-y", "-o"])
            .arg(output)
    }
}

/// True Audio. The tool takes no tuning options, so there is a single
/// configuration labelled `TTA`.
#[derive(Debug, Clone)]
pub struct Tta;

impl CommandCodec for Tta {
    fn family(&self) -> &str {
        "TTA"
    }
    fn options(&self) -> &str {
        ""
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("tta").arg("-e").arg(input).arg(output)
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("tta").arg("-d").arg(input).arg(output)
    }
}

/// Monkey's Audio (`mac`)
#[derive(Debug, Clone)]
pub struct MonkeysAudio {
    options: String,
}

impl CommandCodec for MonkeysAudio {
    fn family(&self) -> &str {
        "Monkey's Audio"
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("mac")
            .arg(input)
            .arg(output)
            .options(&self.options)
    }
    fn pre_decode(&self, input: &Path) -> Result<PathBuf, CodecError> {
        relocate_with_extension(input, "ape")
    }
    fn scratch_siblings(&self, path: &Path) -> Vec<PathBuf> {
        with_extensions(path, ["ape"])
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("mac").arg(input).arg(output).arg("-d")
    }
}

/// MPEG-4 ALS reference software RM23
#[derive(Debug, Clone)]
pub struct Mpeg4Als {
    options: String,
}

impl Mpeg4Als {
    fn tool() -> Invocation {
        if cfg!(windows) {
            Invocation::new("mp4alsRM23")
        } else {
            Invocation::new("wine64").arg("mp4alsRM23.exe")
        }
    }
}

impl CommandCodec for Mpeg4Als {
    fn family(&self) -> &str {
        "MPEG4-ALS"
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Self::tool().options(&self.options).arg(input).arg(output)
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Self::tool().arg("-x").arg(input).arg(output)
    }
}

/// TAK command-line compressor (`Takc`)
#[derive(Debug, Clone)]
pub struct Tak {
    options: String,
}

impl CommandCodec for Tak {
    fn family(&self) -> &str {
        "TAK"
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("Takc")
            .args(["-e", "-overwrite", "-silent", "-tn1"])
            .options(&self.options)
            .arg(input)
            .arg(output.with_extension("tak"))
    }
    fn post_encode(&self, output: &Path) -> Result<(), CodecError> {
        reclaim_forced_extension(output, "tak")
    }
    fn pre_decode(&self, input: &Path) -> Result<PathBuf, CodecError> {
        relocate_with_extension(input, "tak")
    }
    fn scratch_siblings(&self, path: &Path) -> Vec<PathBuf> {
        with_extensions(path, ["tak"])
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new("Takc")
            .args(["-d", "-overwrite", "-silent", "-tn1"])
            .arg(input)
            .arg(output)
    }
}

/// HALAC, pinned to [`HALAC_VERSION`]
#[derive(Debug, Clone)]
pub struct Halac {
    family: String,
    options: String,
}

impl Halac {
    fn new(options: String) -> Self {
        Self {
            family: format!("HALAC {}", HALAC_VERSION),
            options,
        }
    }
}

impl CommandCodec for Halac {
    fn family(&self) -> &str {
        &self.family
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new(format!("HALAC_ENCODE_{}_x64", HALAC_VERSION))
            .arg(input)
            .arg(output.with_extension("halac"))
            .options(&self.options)
    }
    fn post_encode(&self, output: &Path) -> Result<(), CodecError> {
        reclaim_forced_extension(output, "halac")
    }
    fn pre_decode(&self, input: &Path) -> Result<PathBuf, CodecError> {
        relocate_with_extension(input, "halac")
    }
    fn scratch_siblings(&self, path: &Path) -> Vec<PathBuf> {
        with_extensions(path, ["halac"])
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new(format!("HALAC_DECODE_{}_x64", HALAC_VERSION))
            .arg(input)
            .arg(output)
    }
}

/// Tools driven as `<tool> <options> -e|-d IN OUT` (NARU, LINNE, SRLA).
#[derive(Debug, Clone)]
pub struct ModeFlagCodec {
    family: &'static str,
    program: &'static str,
    options: String,
}

impl ModeFlagCodec {
    /// Describe a mode-flag tool
    pub fn new(family: &'static str, program: &'static str, options: String) -> Self {
        Self {
            family,
            program,
            options,
        }
    }

    fn command(&self, mode: &str, input: &Path, output: &Path) -> Invocation {
        Invocation::new(self.program)
            .options(&self.options)
            .arg(mode)
            .arg(input)
            .arg(output)
    }
}

impl CommandCodec for ModeFlagCodec {
    fn family(&self) -> &str {
        self.family
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        self.command("-e", input, output)
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        self.command("-d", input, output)
    }
}

/// User-defined codec commands.
///
/// `encode` and `decode` are whitespace-separated command lines in which
/// `{input}`, `{output}` and `{options}` are substituted. A token equal to
/// `{options}` expands to the individual option words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Family name used in labels
    pub name: String,
    /// Encode command line
    pub encode: String,
    /// Decode command line
    pub decode: String,
    /// Extension the encoder forces onto its output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encode_extension: Option<String>,
    /// Extension the decoder requires on its input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_extension: Option<String>,
}

impl CommandTemplate {
    fn validate(&self) -> Result<(), CodecError> {
        if self.name.trim().is_empty() {
            return Err(CodecError::InvalidConfiguration(
                "template codec needs a non-empty name".to_string(),
            ));
        }
        for (kind, line) in [("encode", &self.encode), ("decode", &self.decode)] {
            if line.split_whitespace().next().is_none() {
                return Err(CodecError::InvalidConfiguration(format!(
                    "template \"{}\" has an empty {} command",
                    self.name, kind
                )));
            }
            if !line.contains("{input}") || !line.contains("{output}") {
                return Err(CodecError::InvalidConfiguration(format!(
                    "template \"{}\" {} command must reference {{input}} and {{output}}",
                    self.name, kind
                )));
            }
        }
        Ok(())
    }

    fn expand(line: &str, input: &Path, output: &Path, options: &str) -> Invocation {
        let mut words: Vec<OsString> = Vec::new();
        for token in line.split_whitespace() {
            match token {
                "{input}" => words.push(input.as_os_str().to_owned()),
                "{output}" => words.push(output.as_os_str().to_owned()),
                "{options}" => words.extend(options.split_whitespace().map(OsString::from)),
                other => words.push(OsString::from(
                    other
                        .replace("{input}", &input.to_string_lossy())
                        .replace("{output}", &output.to_string_lossy())
                        .replace("{options}", options.trim()),
                )),
            }
        }
        let mut words = words.into_iter();
        let program = words.next().unwrap_or_default();
        Invocation::new(program).args(words)
    }
}

/// [`CommandCodec`] driven by a [`CommandTemplate`]
#[derive(Debug, Clone)]
pub struct TemplateCodec {
    template: CommandTemplate,
    options: String,
}

impl CommandCodec for TemplateCodec {
    fn family(&self) -> &str {
        &self.template.name
    }
    fn options(&self) -> &str {
        &self.options
    }
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation {
        let target = match &self.template.encode_extension {
            Some(ext) => output.with_extension(ext),
            None => output.to_path_buf(),
        };
        CommandTemplate::expand(&self.template.encode, input, &target, &self.options)
    }
    fn post_encode(&self, output: &Path) -> Result<(), CodecError> {
        match &self.template.encode_extension {
            Some(ext) => reclaim_forced_extension(output, ext),
            None => Ok(()),
        }
    }
    fn pre_decode(&self, input: &Path) -> Result<PathBuf, CodecError> {
        match &self.template.decode_extension {
            Some(ext) => relocate_with_extension(input, ext),
            None => Ok(input.to_path_buf()),
        }
    }
    fn scratch_siblings(&self, path: &Path) -> Vec<PathBuf> {
        let forced = [&self.template.encode_extension, &self.template.decode_extension];
        with_extensions(path, forced.into_iter().flatten().map(String::as_str))
    }
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation {
        CommandTemplate::expand(&self.template.decode, input, output, &self.options)
    }
}
