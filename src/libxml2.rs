//! LibXML2 FFI wrapper for XML Schema validation of in-memory documents
//!
//! No mature pure Rust XSD validator exists, so schema checks go through
//! libxml2 directly. Schemas are parsed once and shared behind an `Arc`;
//! each validation creates its own validation context, so validations run
//! in parallel.
//!
//! ## Thread safety
//!
//! - Library initialization runs exactly once (`std::sync::Once`).
//! - Schema parsing is not thread-safe in libxml2 and is serialized behind
//!   a process-wide lock.
//! - Validation against a shared, fully parsed schema is thread-safe as long
//!   as every call owns its validation context and document.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int};
use log::debug;

use crate::error::{LibXml2Error, LibXml2Result};

static LIBXML2_INIT: Once = Once::new();

/// Serializes schema parsing across threads
static PARSE_LOCK: Mutex<()> = Mutex::new(());

/// Suppress error reports on stderr; they are captured through callbacks instead
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
/// Never fetch external resources while reading a document
const XML_PARSE_NONET: c_int = 1 << 11;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Schema parsing
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut libc::c_void,
    pub node: *mut libc::c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut libc::c_void, error: *mut xmlError)>;

/// Collects libxml2 diagnostics into the `Vec<String>` behind `user_data`,
/// prefixed with the line number when libxml2 reports one.
unsafe extern "C" fn structured_error_callback(user_data: *mut libc::c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };
    let (msg_ptr, line) = unsafe { ((*error).message, (*error).line) };
    if msg_ptr.is_null() {
        return;
    }

    let message = unsafe { CStr::from_ptr(msg_ptr) }.to_string_lossy();
    let message = message.trim();
    if line > 0 {
        errors.push(format!("line {line}: {message}"));
    } else {
        errors.push(message.to_string());
    }
}

/// Shared handle to a parsed schema; freed when the last clone is dropped
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: a fully parsed xmlSchema is only read during validation
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed elsewhere.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Frees a parsed document on every exit path
struct DocGuard(*mut XmlDoc);

impl Drop for DocGuard {
    fn drop(&mut self) {
        unsafe { xmlFreeDoc(self.0) }
    }
}

/// Frees a validation context on every exit path
struct ValidCtxtGuard(*mut XmlSchemaValidCtxt);

impl Drop for ValidCtxtGuard {
    fn drop(&mut self) {
        unsafe { xmlSchemaFreeValidCtxt(self.0) }
    }
}

/// Outcome of one validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Return code 0
    Valid,
    /// Return code > 0; `code` is the libxml2 error code of the first violation
    Invalid { code: i32, errors: Vec<String> },
    /// Return code < 0
    InternalError { code: i32 },
}

impl ValidationResult {
    pub fn from_code(code: c_int, mut errors: Vec<String>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => {
                if errors.is_empty() {
                    errors.push(format!("libxml2 reported error code {n}"));
                }
                ValidationResult::Invalid { code: n, errors }
            }
            n => ValidationResult::InternalError { code: n },
        }
    }

    /// Number of violations reported; zero unless invalid
    pub fn error_count(&self) -> usize {
        match self {
            ValidationResult::Invalid { errors, .. } => errors.len(),
            _ => 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }
}

/// Entry point for schema parsing and validation
#[derive(Debug)]
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Initializes libxml2 on first use
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parses an XSD from memory. Concurrent callers are serialized.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        let size = c_int::try_from(schema_data.len()).map_err(|_| LibXml2Error::MemoryAllocation)?;
        let _guard = PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut diagnostics: Vec<String> = Vec::new();
        let schema_ptr = unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(schema_data.as_ptr() as *const c_char, size);
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                &mut diagnostics as *mut Vec<String> as *mut libc::c_void,
            );
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };

        if schema_ptr.is_null() {
            for diagnostic in &diagnostics {
                debug!("Schema parse diagnostic: {}", diagnostic);
            }
            return Err(LibXml2Error::SchemaParseFailed);
        }

        unsafe { XmlSchemaPtr::from_raw(schema_ptr) }
    }

    /// Validates an in-memory document against `schema`.
    ///
    /// `name` labels the document in diagnostics. Safe to call concurrently
    /// with the same schema.
    pub fn validate_memory(
        &self,
        schema: &XmlSchemaPtr,
        xml_content: &[u8],
        name: Option<&str>,
    ) -> LibXml2Result<ValidationResult> {
        let label = name.unwrap_or("<memory>");
        let size = c_int::try_from(xml_content.len()).map_err(|_| LibXml2Error::InvalidXml {
            details: format!("{label} is too large"),
        })?;
        let url = CString::new(label).map_err(|_| LibXml2Error::InvalidXml {
            details: "document name contains a NUL byte".to_string(),
        })?;

        unsafe {
            let doc = xmlReadMemory(
                xml_content.as_ptr() as *const c_char,
                size,
                url.as_ptr(),
                std::ptr::null(),
                XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET,
            );
            if doc.is_null() {
                return Err(LibXml2Error::InvalidXml {
                    details: format!("{label} is not well-formed XML"),
                });
            }
            let doc = DocGuard(doc);

            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }
            let valid_ctxt = ValidCtxtGuard(valid_ctxt);

            let mut errors: Vec<String> = Vec::new();
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt.0,
                Some(structured_error_callback),
                &mut errors as *mut Vec<String> as *mut libc::c_void,
            );

            let code = xmlSchemaValidateDoc(valid_ctxt.0, doc.0);
            drop(valid_ctxt);

            match ValidationResult::from_code(code, errors) {
                ValidationResult::InternalError { code } => Err(LibXml2Error::ValidationFailed {
                    code,
                    document: label.to_string(),
                }),
                result => Ok(result),
            }
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
