//! Minimal Office Open XML presentation writer.
//!
//! Produces a package with a single blank master/layout pair and one slide
//! per [`Slide`], each slide holding a title text box and a body text box.
//! Every part except the static theme is written with `quick_xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::deck::{Slide, TextLine};
use super::ArtifactError;

pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CORE_PROPS_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

// 4:3 slide in EMU
const SLIDE_CX: u64 = 9_144_000;
const SLIDE_CY: u64 = 6_858_000;
const MARGIN: u64 = 457_200;

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#;

/// Drop control characters other than tab and newline; XML 1.0 cannot carry them
fn xml_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t' || *c == '\n')
        .collect()
}

/// One XML part under construction
struct Part {
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new() -> Result<Self, ArtifactError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ArtifactError> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    /// Root element carrying the presentationML namespaces
    fn open_pml(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ArtifactError> {
        let mut all = vec![("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)];
        all.extend_from_slice(attrs);
        self.open(name, &all)
    }

    fn close(&mut self, name: &str) -> Result<(), ArtifactError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ArtifactError> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), ArtifactError> {
        self.open(name, &[])?;
        let text = xml_text(text);
        self.writer.write_event(Event::Text(BytesText::new(&text)))?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn relationships(entries: &[(&str, &str, &str)]) -> Result<Vec<u8>, ArtifactError> {
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", REL_NS)])?;
    for &(id, kind, target) in entries {
        // Short kinds live under the officeDocument relationship namespace
        let kind = if kind.starts_with("http") {
            kind.to_string()
        } else {
            format!("{NS_R}/{kind}")
        };
        part.empty("Relationship", &[("Id", id), ("Type", kind.as_str()), ("Target", target)])?;
    }
    part.close("Relationships")?;
    Ok(part.finish())
}

fn content_types(slide_count: usize) -> Result<Vec<u8>, ArtifactError> {
    const OOXML: &str = "application/vnd.openxmlformats-officedocument";
    let overrides = [
        ("/ppt/presentation.xml", format!("{OOXML}.presentationml.presentation.main+xml")),
        ("/ppt/slideMasters/slideMaster1.xml", format!("{OOXML}.presentationml.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml", format!("{OOXML}.presentationml.slideLayout+xml")),
        ("/ppt/theme/theme1.xml", format!("{OOXML}.theme+xml")),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
    ];
    let slide_type = format!("{OOXML}.presentationml.slide+xml");

    let mut part = Part::new()?;
    part.open("Types", &[("xmlns", TYPES_NS)])?;
    part.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (name, kind) in &overrides {
        part.empty("Override", &[("PartName", *name), ("ContentType", kind.as_str())])?;
    }
    for n in 1..=slide_count {
        let name = format!("/ppt/slides/slide{n}.xml");
        part.empty("Override", &[("PartName", name.as_str()), ("ContentType", slide_type.as_str())])?;
    }
    part.close("Types")?;
    Ok(part.finish())
}

fn presentation(slide_count: usize) -> Result<Vec<u8>, ArtifactError> {
    let (cx, cy) = (SLIDE_CX.to_string(), SLIDE_CY.to_string());

    let mut part = Part::new()?;
    part.open_pml("p:presentation", &[("saveSubsetFonts", "1")])?;
    part.open("p:sldMasterIdLst", &[])?;
    part.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    part.close("p:sldMasterIdLst")?;

    part.open("p:sldIdLst", &[])?;
    for n in 1..=slide_count {
        // rId1 is the master, rId2 the theme
        let (id, rel) = ((255 + n).to_string(), format!("rId{}", n + 2));
        part.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    part.close("p:sldIdLst")?;

    part.empty("p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str()), ("type", "screen4x3")])?;
    part.empty("p:notesSz", &[("cx", cy.as_str()), ("cy", cx.as_str())])?;
    part.close("p:presentation")?;
    Ok(part.finish())
}

/// Shape tree header every slide, layout and master starts with
fn empty_group(part: &mut Part) -> Result<(), ArtifactError> {
    part.open("p:nvGrpSpPr", &[])?;
    part.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    part.empty("p:cNvGrpSpPr", &[])?;
    part.empty("p:nvPr", &[])?;
    part.close("p:nvGrpSpPr")?;
    part.open("p:grpSpPr", &[])?;
    part.open("a:xfrm", &[])?;
    part.empty("a:off", &[("x", "0"), ("y", "0")])?;
    part.empty("a:ext", &[("cx", "0"), ("cy", "0")])?;
    part.empty("a:chOff", &[("x", "0"), ("y", "0")])?;
    part.empty("a:chExt", &[("cx", "0"), ("cy", "0")])?;
    part.close("a:xfrm")?;
    part.close("p:grpSpPr")
}

fn slide_master() -> Result<Vec<u8>, ArtifactError> {
    let mut part = Part::new()?;
    part.open_pml("p:sldMaster", &[])?;
    part.open("p:cSld", &[])?;
    part.open("p:bg", &[])?;
    part.open("p:bgRef", &[("idx", "1001")])?;
    part.empty("a:schemeClr", &[("val", "bg1")])?;
    part.close("p:bgRef")?;
    part.close("p:bg")?;
    part.open("p:spTree", &[])?;
    empty_group(&mut part)?;
    part.close("p:spTree")?;
    part.close("p:cSld")?;
    part.empty(
        "p:clrMap",
        &[
            ("bg1", "lt1"),
            ("tx1", "dk1"),
            ("bg2", "lt2"),
            ("tx2", "dk2"),
            ("accent1", "accent1"),
            ("accent2", "accent2"),
            ("accent3", "accent3"),
            ("accent4", "accent4"),
            ("accent5", "accent5"),
            ("accent6", "accent6"),
            ("hlink", "hlink"),
            ("folHlink", "folHlink"),
        ],
    )?;
    part.open("p:sldLayoutIdLst", &[])?;
    part.empty("p:sldLayoutId", &[("id", "2147483649"), ("r:id", "rId1")])?;
    part.close("p:sldLayoutIdLst")?;
    part.close("p:sldMaster")?;
    Ok(part.finish())
}

fn slide_layout() -> Result<Vec<u8>, ArtifactError> {
    let mut part = Part::new()?;
    part.open_pml("p:sldLayout", &[("type", "blank"), ("preserve", "1")])?;
    part.open("p:cSld", &[("name", "Blank")])?;
    part.open("p:spTree", &[])?;
    empty_group(&mut part)?;
    part.close("p:spTree")?;
    part.close("p:cSld")?;
    part.open("p:clrMapOvr", &[])?;
    part.empty("a:masterClrMapping", &[])?;
    part.close("p:clrMapOvr")?;
    part.close("p:sldLayout")?;
    Ok(part.finish())
}

fn core_properties(title: &str) -> Result<Vec<u8>, ArtifactError> {
    let mut part = Part::new()?;
    part.open(
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ],
    )?;
    part.text_element("dc:title", title)?;
    part.text_element("dc:creator", "spelling-decks")?;
    part.close("cp:coreProperties")?;
    Ok(part.finish())
}

fn paragraph(part: &mut Part, line: &TextLine) -> Result<(), ArtifactError> {
    let size = line.size.hundredths().to_string();
    let bold = u8::from(line.bold).to_string();

    part.open("a:p", &[])?;
    part.open("a:pPr", &[])?;
    part.open("a:spcAft", &[])?;
    part.empty("a:spcPts", &[("val", "1000")])?;
    part.close("a:spcAft")?;
    part.close("a:pPr")?;
    part.open("a:r", &[])?;
    part.open(
        "a:rPr",
        &[("lang", "en-US"), ("sz", size.as_str()), ("b", bold.as_str()), ("dirty", "0")],
    )?;
    part.open("a:solidFill", &[])?;
    part.empty("a:srgbClr", &[("val", line.color)])?;
    part.close("a:solidFill")?;
    part.close("a:rPr")?;
    part.text_element("a:t", &line.text)?;
    part.close("a:r")?;
    part.close("a:p")
}

fn text_box(part: &mut Part, id: u32, name: &str, y: u64, cy: u64, lines: &[TextLine]) -> Result<(), ArtifactError> {
    let (id, x, y) = (id.to_string(), MARGIN.to_string(), y.to_string());
    let (cx, cy) = ((SLIDE_CX - 2 * MARGIN).to_string(), cy.to_string());

    part.open("p:sp", &[])?;
    part.open("p:nvSpPr", &[])?;
    part.empty("p:cNvPr", &[("id", id.as_str()), ("name", name)])?;
    part.empty("p:cNvSpPr", &[("txBox", "1")])?;
    part.empty("p:nvPr", &[])?;
    part.close("p:nvSpPr")?;

    part.open("p:spPr", &[])?;
    part.open("a:xfrm", &[])?;
    part.empty("a:off", &[("x", x.as_str()), ("y", y.as_str())])?;
    part.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    part.close("a:xfrm")?;
    part.open("a:prstGeom", &[("prst", "rect")])?;
    part.empty("a:avLst", &[])?;
    part.close("a:prstGeom")?;
    part.empty("a:noFill", &[])?;
    part.close("p:spPr")?;

    part.open("p:txBody", &[])?;
    part.open("a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
    part.empty("a:normAutofit", &[])?;
    part.close("a:bodyPr")?;
    part.empty("a:lstStyle", &[])?;
    if lines.is_empty() {
        // txBody needs at least one paragraph
        part.empty("a:p", &[])?;
    }
    for line in lines {
        paragraph(part, line)?;
    }
    part.close("p:txBody")?;
    part.close("p:sp")
}

fn slide(slide: &Slide) -> Result<Vec<u8>, ArtifactError> {
    let title_cy = 1_143_000;
    let body_y = MARGIN + title_cy + MARGIN / 2;

    let mut part = Part::new()?;
    part.open_pml("p:sld", &[])?;
    part.open("p:cSld", &[])?;
    part.open("p:spTree", &[])?;
    empty_group(&mut part)?;
    text_box(&mut part, 2, "Title", MARGIN, title_cy, std::slice::from_ref(&slide.title))?;
    text_box(&mut part, 3, "Body", body_y, SLIDE_CY - body_y - MARGIN, &slide.body)?;
    part.close("p:spTree")?;
    part.close("p:cSld")?;
    part.open("p:clrMapOvr", &[])?;
    part.empty("a:masterClrMapping", &[])?;
    part.close("p:clrMapOvr")?;
    part.close("p:sld")?;
    Ok(part.finish())
}

/// Render slides into the bytes of a `.pptx` file
pub fn render(title: &str, slides: &[Slide]) -> Result<Vec<u8>, ArtifactError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut put = |name: &str, body: Vec<u8>| -> Result<(), ArtifactError> {
        zip.start_file(name, options)?;
        zip.write_all(&body)?;
        Ok(())
    };

    put("[Content_Types].xml", content_types(slides.len())?)?;
    put(
        "_rels/.rels",
        relationships(&[
            ("rId1", "officeDocument", "ppt/presentation.xml"),
            ("rId2", CORE_PROPS_REL, "docProps/core.xml"),
        ])?,
    )?;
    put("docProps/core.xml", core_properties(title)?)?;

    let slide_targets: Vec<String> = (1..=slides.len()).map(|n| format!("slides/slide{n}.xml")).collect();
    let slide_ids: Vec<String> = (1..=slides.len()).map(|n| format!("rId{}", n + 2)).collect();
    let mut presentation_rels = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    for (id, target) in slide_ids.iter().zip(&slide_targets) {
        presentation_rels.push((id.as_str(), "slide", target.as_str()));
    }
    put("ppt/presentation.xml", presentation(slides.len())?)?;
    put("ppt/_rels/presentation.xml.rels", relationships(&presentation_rels)?)?;

    put("ppt/theme/theme1.xml", format!("{XML_DECL}{THEME}").into_bytes())?;
    put("ppt/slideMasters/slideMaster1.xml", slide_master()?)?;
    put(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])?,
    )?;
    put("ppt/slideLayouts/slideLayout1.xml", slide_layout()?)?;
    put(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")])?,
    )?;

    let layout_rels = relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")])?;
    for (i, s) in slides.iter().enumerate() {
        let n = i + 1;
        put(&format!("ppt/slides/slide{n}.xml"), slide(s)?)?;
        put(&format!("ppt/slides/_rels/slide{n}.xml.rels"), layout_rels.clone())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
