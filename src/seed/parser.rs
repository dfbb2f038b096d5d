//! Line-oriented recursive-descent parser for seed files.
//!
//! ```text
//! document  := (section | page | line)*
//! section   := "## " NAME NL body
//! page      := "### PAGE: " NAME NL blank* fence(meta) page_body
//! page_body := (block | line)*   until "### PAGE:" | "## " | "---" (last page only)
//! block     := "**BLOCK " N ": " NAME "**" NL blank* fence(block_body)
//! block_body:= kv_line* ("CONTENT:" NL json)? ("STYLING:" NL json)?
//! fence     := "```" LANG? NL line* "```"
//! ```

use serde_json::{Map, Value};

use super::error::{ParseWarning, SeedError};
use super::types::{Metadata, SeedBlock, SeedDocument, SeedPage};

const METADATA_SECTION: &str = "METADATA";
const GLOBAL_STYLES_SECTION: &str = "GLOBAL STYLES";
const SETTINGS_SECTION: &str = "SETTINGS";

/// Parses seed markdown into a [`SeedDocument`]
pub fn parse_seed(text: &str) -> Result<SeedDocument, SeedError> {
    SeedParser::new(text).parse()
}

/// A fenced code block with the 1-based number of its opening line
#[derive(Debug)]
struct Fence<'a> {
    line: usize,
    lang: &'a str,
    body: Vec<(usize, &'a str)>,
}

enum BodyItem<'a> {
    Line(&'a str),
    Fence(Fence<'a>),
}

struct SeedParser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    warnings: Vec<ParseWarning>,
}

impl<'a> SeedParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
            warnings: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// 1-based number of the current line
    fn line_no(&self) -> usize {
        self.pos + 1
    }

    fn parse(mut self) -> Result<SeedDocument, SeedError> {
        let mut doc = SeedDocument::default();
        let mut seen_metadata = false;
        let mut seen_styles = false;
        let mut seen_settings = false;

        while let Some(line) = self.peek() {
            if let Some(name) = page_heading(line) {
                let page = self.page(name)?;
                doc.pages.push(page);
            } else if let Some(name) = section_heading(line) {
                let items = self.section_body()?;
                match name {
                    METADATA_SECTION if !seen_metadata => {
                        seen_metadata = true;
                        doc.metadata = key_values(items.iter().filter_map(|item| match item {
                            BodyItem::Line(l) => Some(*l),
                            BodyItem::Fence(_) => None,
                        }));
                    }
                    GLOBAL_STYLES_SECTION if !seen_styles => {
                        seen_styles = true;
                        doc.global_styles = self.section_json(name, &items);
                    }
                    SETTINGS_SECTION if !seen_settings => {
                        seen_settings = true;
                        doc.settings = self.section_json(name, &items);
                    }
                    _ => {}
                }
            } else if is_fence(line) {
                self.fence()?;
            } else {
                self.pos += 1;
            }
        }

        for warning in &self.warnings {
            tracing::warn!("Seed parse warning: {}", warning);
        }
        doc.warnings = self.warnings;
        Ok(doc)
    }

    /// Consumes a section heading and its body up to the next heading
    fn section_body(&mut self) -> Result<Vec<BodyItem<'a>>, SeedError> {
        self.pos += 1;
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            if section_heading(line).is_some() || page_heading(line).is_some() {
                break;
            }
            if is_fence(line) {
                items.push(BodyItem::Fence(self.fence()?));
            } else {
                items.push(BodyItem::Line(line));
                self.pos += 1;
            }
        }
        Ok(items)
    }

    /// The first ```json fence of a section, as an object
    fn section_json(&mut self, section: &str, items: &[BodyItem<'a>]) -> Map<String, Value> {
        let fence = items.iter().find_map(|item| match item {
            BodyItem::Fence(f) if f.lang.eq_ignore_ascii_case("json") => Some(f),
            _ => None,
        });
        match fence {
            Some(f) => {
                let text = fence_text(&f.body);
                self.json_object(&text, f.line, &format!("{} section", section))
            }
            None => Map::new(),
        }
    }

    fn fence(&mut self) -> Result<Fence<'a>, SeedError> {
        let open = self.line_no();
        let lang = self.peek().map(|l| l.trim()[3..].trim()).unwrap_or("");
        self.pos += 1;

        let mut body = Vec::new();
        while let Some(line) = self.peek() {
            if is_fence(line) {
                self.pos += 1;
                return Ok(Fence { line: open, lang, body });
            }
            body.push((self.line_no(), line));
            self.pos += 1;
        }
        Err(SeedError::UnterminatedFence { line: open })
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(line) if line.trim().is_empty()) {
            self.pos += 1;
        }
    }

    fn page(&mut self, name: &'a str) -> Result<SeedPage, SeedError> {
        let heading = self.line_no();
        self.pos += 1;
        self.skip_blank();

        let meta = match self.peek() {
            Some(line) if is_fence(line) => self.fence()?,
            _ => {
                return Err(SeedError::MissingPageMetadata {
                    line: heading,
                    page: name.to_string(),
                })
            }
        };

        let mut page = SeedPage {
            name: name.to_string(),
            metadata: key_values(meta.body.iter().map(|(_, l)| *l)),
            blocks: Vec::new(),
        };

        while let Some(line) = self.peek() {
            if page_heading(line).is_some() || section_heading(line).is_some() {
                break;
            }
            // A rule closes the last page only; earlier pages run to the next heading
            if line.starts_with("---") && !self.page_follows() {
                break;
            }
            if let Some((number, block_name)) = block_heading(line) {
                let block = self.block(number, block_name)?;
                page.blocks.push(block);
            } else if is_fence(line) {
                self.fence()?;
            } else {
                self.pos += 1;
            }
        }

        Ok(page)
    }

    fn page_follows(&self) -> bool {
        self.lines[self.pos..].iter().any(|l| page_heading(l).is_some())
    }

    fn block(&mut self, number: u32, name: &'a str) -> Result<SeedBlock, SeedError> {
        let heading = self.line_no();
        self.pos += 1;
        self.skip_blank();

        let fence = match self.peek() {
            Some(line) if is_fence(line) => self.fence()?,
            _ => {
                return Err(SeedError::MissingBlockFence {
                    line: heading,
                    block: name.to_string(),
                })
            }
        };

        #[derive(PartialEq)]
        enum Part {
            Meta,
            Content,
            Styling,
        }

        let mut part = Part::Meta;
        let mut meta_lines = Vec::new();
        let mut content: Option<(usize, Vec<(usize, &str)>)> = None;
        let mut styling: Option<(usize, Vec<(usize, &str)>)> = None;

        for (line_no, line) in fence.body {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("CONTENT:") {
                part = Part::Content;
                content = Some((line_no, vec![(line_no, rest)]));
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("STYLING:") {
                part = Part::Styling;
                styling = Some((line_no, vec![(line_no, rest)]));
                continue;
            }
            match part {
                Part::Meta => meta_lines.push(line),
                Part::Content => {
                    if let Some((_, lines)) = content.as_mut() {
                        lines.push((line_no, line));
                    }
                }
                Part::Styling => {
                    if let Some((_, lines)) = styling.as_mut() {
                        lines.push((line_no, line));
                    }
                }
            }
        }

        let content = match content {
            Some((line, lines)) => {
                self.json_object(&fence_text(&lines), line, &format!("content of block '{}'", name))
            }
            None => Map::new(),
        };
        let styling = match styling {
            Some((line, lines)) => {
                self.json_object(&fence_text(&lines), line, &format!("styling of block '{}'", name))
            }
            None => Map::new(),
        };

        Ok(SeedBlock {
            number,
            name: name.to_string(),
            metadata: key_values(meta_lines.into_iter()),
            content,
            styling,
        })
    }

    /// Parses `text` as a JSON object, recording a warning and yielding `{}` on failure
    fn json_object(&mut self, text: &str, line: usize, what: &str) -> Map<String, Value> {
        let message = match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Object(map)) => return map,
            Ok(_) => format!("{} is not a JSON object", what),
            Err(e) => format!("failed to parse {}: {}", what, e),
        };
        self.warnings.push(ParseWarning { line, message });
        Map::new()
    }
}

fn fence_text(lines: &[(usize, &str)]) -> String {
    lines.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n")
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn section_heading(line: &str) -> Option<&str> {
    line.strip_prefix("## ").map(str::trim)
}

fn page_heading(line: &str) -> Option<&str> {
    line.strip_prefix("### PAGE:").map(str::trim)
}

/// `**BLOCK 2: Features**` -> `(2, "Features")`
fn block_heading(line: &str) -> Option<(u32, &str)> {
    let inner = line.trim().strip_prefix("**BLOCK ")?.strip_suffix("**")?;
    let (number, name) = inner.split_once(':')?;
    let number = number.trim().parse().ok()?;
    Some((number, name.trim()))
}

/// `Client Name: Acme` -> `client_name = "Acme"`; `#` lines are comments
fn key_values<'l>(lines: impl Iterator<Item = &'l str>) -> Metadata {
    let mut out = Metadata::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase();
        if key.is_empty() {
            continue;
        }
        out.insert(key, value.trim().to_string());
    }
    out
}
