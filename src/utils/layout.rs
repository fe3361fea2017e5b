//! Span-level layout extraction.
//!
//! Walks each page's content stream, descending into form XObjects, and
//! records every shown string together with its effective font size and the
//! style markers the heading heuristic cares about (bold font face, chromatic
//! fill colour).

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use super::pdf_parser::page_window;
use crate::error::{Error, Result};
use crate::model::{FontSize, FontSpan};

/// TJ adjustments beyond this (thousandths of an em) read as a word gap
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Nesting limit for form XObjects drawn inside form XObjects
const MAX_FORM_DEPTH: usize = 12;

/// Extract font spans from pages `start_page..=end_page` (1-based)
///
/// Spans come back in page, block, line, span order. A range that selects
/// no page yields an empty list.
pub fn extract_spans(bytes: &[u8], start_page: i64, end_page: i64) -> Result<Vec<FontSpan>> {
    let doc = Document::load_mem(bytes).map_err(|e| Error::DocumentParse(e.to_string()))?;
    let pages = doc.get_pages();

    let Some(window) = page_window(start_page, end_page, pages.len() as u32) else {
        warn!(
            "Page range {}-{} selects no pages (document has {})",
            start_page,
            end_page,
            pages.len()
        );
        return Ok(Vec::new());
    };

    let mut spans = Vec::new();
    for (&page_num, &page_id) in pages.range(window) {
        let page_spans = PageScanner::new(&doc, page_num, page_id).scan()?;
        debug!("Page {}: {} spans", page_num, page_spans.len());
        spans.extend(page_spans);
    }

    Ok(spans)
}

/// Whether a BaseFont name denotes a heavy face
pub fn is_bold_font(base_font: &str) -> bool {
    let name = base_font.to_lowercase();
    ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|marker| name.contains(marker))
}

/// Whether fill colour components describe a non-grey colour
///
/// One component is grey, three are RGB, four are CMYK (the K channel is
/// ignored).
fn is_chromatic(components: &[f32]) -> bool {
    match components {
        [r, g, b] | [r, g, b, _] => (r - g).abs() > 0.01 || (g - b).abs() > 0.01,
        _ => false,
    }
}

/// Fill colour space, as far as colour detection needs it
#[derive(Debug, Clone, Copy, PartialEq)]
enum FillSpace {
    Gray,
    Rgb,
    Cmyk,
    Lab,
    /// Separation or DeviceN; `true` when a colorant other than black
    Spot(bool),
    /// Indexed and pattern fills, which are not resolved
    Opaque,
}

impl FillSpace {
    fn is_colored(self, components: &[f32]) -> bool {
        match self {
            FillSpace::Gray | FillSpace::Opaque => false,
            FillSpace::Rgb | FillSpace::Cmyk => is_chromatic(components),
            FillSpace::Lab => matches!(components, [_, a, b, ..] if a.abs() > 1.0 || b.abs() > 1.0),
            FillSpace::Spot(chromatic) => chromatic && components.iter().any(|&tint| tint > 0.0),
        }
    }

    /// Colour a fresh `cs` selection starts with
    fn initial_components(self) -> Vec<f32> {
        match self {
            FillSpace::Spot(_) => vec![1.0],
            FillSpace::Cmyk => vec![0.0, 0.0, 0.0, 1.0],
            _ => vec![0.0],
        }
    }
}

fn is_process_black(colorant: &[u8]) -> bool {
    matches!(colorant, b"Black" | b"All" | b"None")
}

#[derive(Debug, Clone)]
struct GraphicsState {
    font_key: Vec<u8>,
    font_size: f32,
    fill_space: FillSpace,
    colored: bool,
    ctm: Matrix,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 12.0,
            fill_space: FillSpace::Gray,
            colored: false,
            ctm: Matrix::default(),
        }
    }
}

impl GraphicsState {
    fn set_fill(&mut self, space: FillSpace, components: &[f32]) {
        self.fill_space = space;
        self.colored = space.is_colored(components);
    }
}

struct PageScanner<'a> {
    doc: &'a Document,
    page_num: u32,
    page_id: ObjectId,
    /// Resource dictionaries in lookup order; replaced inside a form
    resources: Vec<&'a Dictionary>,
    /// Forms currently being drawn
    open_forms: Vec<ObjectId>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    matrix: Matrix,
    leading: f32,
    block: usize,
    blocks_seen: usize,
    line: usize,
    last_y: Option<f32>,
    line_break_pending: bool,
    spans: Vec<FontSpan>,
}

impl<'a> PageScanner<'a> {
    fn new(doc: &'a Document, page_num: u32, page_id: ObjectId) -> Self {
        let resources = match doc.get_page_resources(page_id) {
            Ok((inline, inherited)) => inline
                .into_iter()
                .chain(inherited.into_iter().filter_map(|id| doc.get_dictionary(id).ok()))
                .collect(),
            Err(e) => {
                warn!("Page {}: could not read resources: {}", page_num, e);
                Vec::new()
            }
        };

        Self {
            doc,
            page_num,
            page_id,
            resources,
            open_forms: Vec::new(),
            state: GraphicsState::default(),
            saved: Vec::new(),
            matrix: Matrix::default(),
            leading: 0.0,
            block: 0,
            blocks_seen: 0,
            line: 0,
            last_y: None,
            line_break_pending: false,
            spans: Vec::new(),
        }
    }

    fn scan(mut self) -> Result<Vec<FontSpan>> {
        let raw = self
            .doc
            .get_page_content(self.page_id)
            .map_err(|e| Error::DocumentParse(format!("page {}: {}", self.page_num, e)))?;
        let content = Content::decode(&raw)
            .map_err(|e| Error::DocumentParse(format!("page {}: {}", self.page_num, e)))?;

        self.run(&content.operations);
        Ok(self.spans)
    }

    fn run(&mut self, operations: &[Operation]) {
        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => self.saved.push(self.state.clone()),
                "Q" => {
                    if let Some(state) = self.saved.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.state.ctm = m.multiply(&self.state.ctm);
                    }
                }
                "BT" => {
                    self.matrix = Matrix::default();
                    self.block = self.blocks_seen;
                    self.blocks_seen += 1;
                    self.line = 0;
                    self.last_y = None;
                    self.line_break_pending = false;
                }
                "ET" => {}
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands.as_slice() {
                        self.state.font_key = name.clone();
                        self.state.font_size = get_number(size).unwrap_or(self.state.font_size);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        self.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(get_number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(get_number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.leading = -ty;
                    }
                    self.matrix.translate(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.matrix = m;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let text = self.decode(bytes);
                        self.emit(text);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let text = self.decode_array(items);
                        self.emit(text);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let text = self.decode(bytes);
                        self.emit(text);
                    }
                }
                "\"" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        let text = self.decode(bytes);
                        self.emit(text);
                    }
                }
                "g" => self.state.set_fill(FillSpace::Gray, &numbers(operands)),
                "rg" => self.state.set_fill(FillSpace::Rgb, &numbers(operands)),
                "k" => self.state.set_fill(FillSpace::Cmyk, &numbers(operands)),
                "cs" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        let space = self.fill_space(name);
                        self.state.set_fill(space, &space.initial_components());
                    }
                }
                "sc" | "scn" => {
                    let space = self.state.fill_space;
                    self.state.set_fill(space, &numbers(operands));
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name);
                    }
                }
                _ => {}
            }
        }
    }

    /// Resolve `/category /name` through the current resource dictionaries
    fn resource(&self, category: &[u8], name: &[u8]) -> Option<(Option<ObjectId>, &'a Object)> {
        self.resources.iter().copied().find_map(|resources: &'a Dictionary| {
            let entries = self.doc.get_dict_in_dict(resources, category).ok()?;
            let entry = entries.get(name).ok()?;
            self.doc.dereference(entry).ok()
        })
    }

    fn font(&self) -> Option<&'a Dictionary> {
        self.resource(b"Font", &self.state.font_key)
            .and_then(|(_, font)| font.as_dict().ok())
    }

    fn fill_space(&self, name: &[u8]) -> FillSpace {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => return FillSpace::Gray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => return FillSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => return FillSpace::Cmyk,
            b"Pattern" => return FillSpace::Opaque,
            _ => {}
        }

        match self.resource(b"ColorSpace", name) {
            Some((_, space)) => self.describe_space(space),
            None => {
                debug!(
                    "Page {}: unknown colour space {}",
                    self.page_num,
                    String::from_utf8_lossy(name)
                );
                FillSpace::Opaque
            }
        }
    }

    fn describe_space(&self, space: &Object) -> FillSpace {
        let family = |items: &[Object]| -> Option<Vec<u8>> {
            items.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec)
        };

        match space {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" => FillSpace::Gray,
                b"DeviceRGB" | b"CalRGB" => FillSpace::Rgb,
                b"DeviceCMYK" => FillSpace::Cmyk,
                _ => FillSpace::Opaque,
            },
            Object::Array(items) => match family(items.as_slice()).as_deref() {
                Some(b"CalGray") => FillSpace::Gray,
                Some(b"CalRGB") => FillSpace::Rgb,
                Some(b"Lab") => FillSpace::Lab,
                Some(b"ICCBased") => self.icc_space(items.get(1)),
                Some(b"Separation") => {
                    let chromatic = items
                        .get(1)
                        .and_then(|o| o.as_name().ok())
                        .is_some_and(|colorant| !is_process_black(colorant));
                    FillSpace::Spot(chromatic)
                }
                Some(b"DeviceN") => {
                    let chromatic = items
                        .get(1)
                        .and_then(|o| self.doc.dereference(o).ok())
                        .and_then(|(_, names)| names.as_array().ok())
                        .is_some_and(|names| {
                            names
                                .iter()
                                .filter_map(|n| n.as_name().ok())
                                .any(|colorant| !is_process_black(colorant))
                        });
                    FillSpace::Spot(chromatic)
                }
                _ => FillSpace::Opaque,
            },
            _ => FillSpace::Opaque,
        }
    }

    /// ICC profiles are classified by their component count
    fn icc_space(&self, profile: Option<&Object>) -> FillSpace {
        let components = profile
            .and_then(|o| self.doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_stream().ok())
            .and_then(|stream| stream.dict.get(b"N").ok())
            .and_then(get_number);

        match components {
            Some(n) if n == 3.0 => FillSpace::Rgb,
            Some(n) if n == 4.0 => FillSpace::Cmyk,
            Some(_) => FillSpace::Gray,
            None => FillSpace::Opaque,
        }
    }

    fn draw_xobject(&mut self, name: &[u8]) {
        let Some((id, object)) = self.resource(b"XObject", name) else {
            debug!("Page {}: missing XObject {}", self.page_num, String::from_utf8_lossy(name));
            return;
        };
        let Ok(stream) = object.as_stream() else {
            return;
        };
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Form".as_slice()) {
            return;
        }

        let Some(id) = id else {
            return;
        };
        if self.open_forms.contains(&id) || self.open_forms.len() >= MAX_FORM_DEPTH {
            warn!("Page {}: skipping recursive form {:?}", self.page_num, id);
            return;
        }

        let operations = match decode_stream(stream) {
            Ok(content) => content.operations,
            Err(e) => {
                warn!("Page {}: unreadable form {:?}: {}", self.page_num, id, e);
                return;
            }
        };

        // A form runs inside its own q/Q with its own resources and text state.
        let form_resources: Vec<&'a Dictionary> = match self.doc.get_dict_in_dict(&stream.dict, b"Resources") {
            Ok(resources) => vec![resources],
            Err(_) => self.resources.clone(),
        };
        let outer_resources = std::mem::replace(&mut self.resources, form_resources);
        let outer_state = self.state.clone();
        let outer_depth = self.saved.len();
        let outer_text = (self.matrix, self.leading, self.block, self.line, self.last_y);

        if let Some(m) = stream.dict.get(b"Matrix").ok().and_then(|m| m.as_array().ok()) {
            if let Some(m) = Matrix::from_operands(m) {
                self.state.ctm = m.multiply(&self.state.ctm);
            }
        }

        self.open_forms.push(id);
        self.run(&operations);
        self.open_forms.pop();

        self.saved.truncate(outer_depth);
        self.state = outer_state;
        self.resources = outer_resources;
        (self.matrix, self.leading, self.block, self.line, self.last_y) = outer_text;
    }

    fn next_line(&mut self) {
        self.matrix.translate(0.0, -self.leading);
        self.line_break_pending = true;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let decoded = self
            .font()
            .and_then(|font| font.get_font_encoding(self.doc).ok())
            .and_then(|encoding| Document::decode_text(&encoding, bytes).ok());

        match decoded {
            Some(text) if !text.is_empty() => text,
            _ => decode_text_simple(bytes),
        }
    }

    fn decode_array(&self, items: &[Object]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(bytes)),
                other => {
                    let gap = get_number(other).map(|n| -n).unwrap_or(0.0);
                    if gap > TJ_SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }

    fn base_font(&self) -> String {
        self.font()
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|name| name.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_else(|| String::from_utf8_lossy(&self.state.font_key).into_owned())
    }

    fn emit(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }

        let y = self.matrix.f;
        if let Some(last_y) = self.last_y {
            if self.line_break_pending || (last_y - y).abs() > 0.5 {
                self.line += 1;
            }
        }
        self.last_y = Some(y);
        self.line_break_pending = false;

        let rendering = self.matrix.multiply(&self.state.ctm);
        let size = self.state.font_size * rendering.vertical_scale();
        self.spans.push(FontSpan {
            text,
            size: FontSize::from_points(size),
            bold: is_bold_font(&self.base_font()),
            colored: self.state.colored,
            page: self.page_num,
            block: self.block,
            line: self.line,
        });
    }
}

fn decode_stream(stream: &Stream) -> lopdf::Result<Content> {
    match stream.decompressed_content() {
        Ok(data) => Content::decode(&data),
        Err(_) => Content::decode(&stream.content),
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl Matrix {
    fn from_operands(operands: &[Object]) -> Option<Self> {
        match numbers(operands).as_slice() {
            &[a, b, c, d, e, f] => Some(Self { a, b, c, d, e, f }),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`
    fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn vertical_scale(&self) -> f32 {
        let scale = (self.c * self.c + self.d * self.d).sqrt();
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(get_number).collect()
}

/// Fallback decoding when the font carries no usable encoding
fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
