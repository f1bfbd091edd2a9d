//! Export Module
//! Serializes tables to CSV or XLSX bytes for download.
//!
//! XLSX files are written as direct ZIP/XML generation: one worksheet, inline
//! strings, no shared-string table. Every ZIP entry carries the same fixed
//! timestamp so identical tables produce identical bytes.

use crate::data::cell::cell_text;
use crate::data::FileFormat;
use polars::prelude::*;
use std::io::{Cursor, Write};
use thiserror::Error;
use ::zip::result::ZipError;
use ::zip::write::FileOptions;
use ::zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to build workbook: {0}")]
    Zip(#[from] ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A converted file ready to be saved by the user.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Converts a table into the chosen format, naming it after the original upload.
pub fn export(
    df: &DataFrame,
    format: FileFormat,
    original_name: &str,
) -> Result<Download, ExportError> {
    let bytes = format.encode(df)?;
    let file_name = output_file_name(original_name, format);
    log::info!(
        "Converted {} to {} ({} bytes)",
        original_name,
        file_name,
        bytes.len()
    );
    Ok(Download {
        file_name,
        mime_type: format.mime_type(),
        bytes,
    })
}

/// `data.csv` -> `data.xlsx`; the original extension is replaced, not appended to.
pub fn output_file_name(original_name: &str, format: FileFormat) -> String {
    let stem = match original_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original_name,
    };
    format!("{}.{}", stem, format.extension())
}

/// CSV with a header row and no index column.
pub fn write_csv(df: &DataFrame) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;
    Ok(buffer)
}

/// Single-sheet XLSX workbook with a header row and no index column.
pub fn write_xlsx(df: &DataFrame) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS_XML.as_bytes())?;

    zip.start_file("docProps/app.xml", options)?;
    zip.write_all(APP_PROPS_XML.as_bytes())?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(CORE_PROPS_XML.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(WORKBOOK_XML.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(sheet_xml(df)?.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// A cell as it is stored in the sheet XML.
#[derive(Debug, Clone, PartialEq)]
enum SheetCell {
    Number(String),
    Bool(bool),
    Text(String),
}

impl SheetCell {
    fn from_value(value: &AnyValue) -> Option<SheetCell> {
        match value {
            AnyValue::Null => None,
            AnyValue::Boolean(b) => Some(SheetCell::Bool(*b)),
            AnyValue::Int8(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::Int16(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::Int32(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::Int64(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::UInt8(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::UInt16(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::UInt32(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::UInt64(v) => Some(SheetCell::Number(v.to_string())),
            AnyValue::Float32(f) if f.is_finite() => Some(SheetCell::Number(f.to_string())),
            AnyValue::Float64(f) if f.is_finite() => Some(SheetCell::Number(f.to_string())),
            AnyValue::Float32(_) | AnyValue::Float64(_) => None,
            other => Some(SheetCell::Text(cell_text(other))),
        }
    }

    fn to_xml(&self, reference: &str) -> String {
        match self {
            SheetCell::Number(n) => format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n),
            SheetCell::Bool(b) => {
                format!(r#"<c r="{}" t="b"><v>{}</v></c>"#, reference, u8::from(*b))
            }
            SheetCell::Text(s) => format!(
                r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                reference,
                escape_xml(s)
            ),
        }
    }
}

fn sheet_xml(df: &DataFrame) -> Result<String, ExportError> {
    let mut rows = String::new();

    // Header
    rows.push_str(r#"<row r="1">"#);
    for (col_idx, name) in df.get_column_names().iter().enumerate() {
        let cell = SheetCell::Text(name.to_string());
        rows.push_str(&cell.to_xml(&cell_reference(col_idx, 0)));
    }
    rows.push_str("</row>\n");

    // Data
    let columns = df.get_columns();
    for row_idx in 0..df.height() {
        let row_num = row_idx + 2;
        rows.push_str(&format!(r#"<row r="{}">"#, row_num));
        for (col_idx, column) in columns.iter().enumerate() {
            let value = column.get(row_idx)?;
            if let Some(cell) = SheetCell::from_value(&value) {
                rows.push_str(&cell.to_xml(&cell_reference(col_idx, row_idx + 1)));
            }
        }
        rows.push_str("</row>\n");
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>
{}</sheetData>
</worksheet>"#,
        rows
    ))
}

/// Zero-based column/row to an A1 reference.
fn cell_reference(col_idx: usize, row_idx: usize) -> String {
    format!("{}{}", column_letters(col_idx), row_idx + 1)
}

fn column_letters(mut col_idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col_idx % 26) as u8);
        if col_idx < 26 {
            break;
        }
        col_idx = col_idx / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Escape XML specials and drop control characters XML 1.0 cannot carry.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<Application>Data Sweeper</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#;

const CORE_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>Data Sweeper</dc:creator>
<cp:lastModifiedBy>Data Sweeper</cp:lastModifiedBy>
</cp:coreProperties>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;
