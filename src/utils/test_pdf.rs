//! In-memory PDF fixtures for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

pub struct SampleSpan {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub color: Option<(f32, f32, f32)>,
}

impl SampleSpan {
    pub fn regular(text: &str, size: f32) -> Self {
        Self {
            text: text.to_string(),
            size,
            bold: false,
            color: None,
        }
    }

    pub fn bold(text: &str, size: f32) -> Self {
        Self {
            bold: true,
            ..Self::regular(text, size)
        }
    }

    pub fn colored(text: &str, size: f32) -> Self {
        Self {
            color: Some((0.8, 0.1, 0.1)),
            ..Self::regular(text, size)
        }
    }
}

/// Extra resources shared by every page of a raw fixture
///
/// The form, when present, is registered as `/Fm1` and uses the page
/// resources, so a form drawing `/Fm1` refers to itself.
#[derive(Default)]
pub struct ExtraResources {
    pub form: Option<Vec<Operation>>,
    pub form_matrix: Option<[f32; 6]>,
    pub color_spaces: Vec<(&'static str, Object)>,
}

/// `BT /F1 size Tf 72 y Td (text) Tj ET`
pub fn show_text(font: &str, size: f32, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![72i64.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

pub fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

/// Build a PDF with one text object per span, one page per inner vec
pub fn build_pdf(pages: &[Vec<SampleSpan>]) -> Vec<u8> {
    let contents = pages.iter().map(|spans| span_operations(spans)).collect();
    build_pdf_from_operations(contents, ExtraResources::default())
}

/// Build a PDF whose pages run the given operations verbatim
pub fn build_pdf_from_operations(pages: Vec<Vec<Operation>>, extra: ExtraResources) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    };

    if let Some(operations) = extra.form {
        let mut form_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0i64.into(), 0i64.into(), 612i64.into(), 792i64.into()],
            "Resources" => resources_id,
        };
        if let Some(matrix) = extra.form_matrix {
            form_dict.set("Matrix", matrix.iter().map(|&v| v.into()).collect::<Vec<Object>>());
        }
        let content = Content { operations };
        let form_id = doc.add_object(Stream::new(
            form_dict,
            content.encode().expect("encode form stream"),
        ));
        resources.set("XObject", dictionary! { "Fm1" => form_id });
    }

    if !extra.color_spaces.is_empty() {
        let mut spaces = Dictionary::new();
        for (name, space) in extra.color_spaces {
            spaces.set(name, space);
        }
        resources.set("ColorSpace", spaces);
    }
    doc.objects.insert(resources_id, Object::Dictionary(resources));

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), 612i64.into(), 792i64.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("serialize test PDF");
    buffer
}

fn span_operations(spans: &[SampleSpan]) -> Vec<Operation> {
    let mut operations = Vec::new();
    let mut y: i64 = 740;
    for span in spans {
        let mut text = show_text(if span.bold { "F2" } else { "F1" }, span.size, y, &span.text);
        let fill = match span.color {
            Some((r, g, b)) => op("rg", vec![r.into(), g.into(), b.into()]),
            None => op("g", vec![0i64.into()]),
        };
        text.insert(1, fill);
        operations.extend(text);
        y -= 30;
    }
    operations
}
