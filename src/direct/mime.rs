use std::path::Path;

/// Reported when no table entry matches the extension.
pub const MIME_UNAVAILABLE: &str = "mime-type/not.available";

/// Extension to MIME type, common formats plus the research-data formats
/// repositories care about (statistical packages, notebooks, bibliographies).
const MIME_TYPES: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("bib", "text/x-bibtex"),
    ("csv", "text/csv"),
    ("dat", "text/x-fixed-field"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("gz", "application/gzip"),
    ("hdf5", "application/x-hdf5"),
    ("ipynb", "application/x-ipynb+json"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("root", "application/octet-stream"),
    ("sav", "application/x-spss-sav"),
    ("tar", "application/x-tar"),
    ("tsv", "text/tab-separated-values"),
    ("txt", "text/plain"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// Guesses the MIME type from the file extension, case-insensitively.
pub fn infer_mime(path: &Path) -> String {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return MIME_UNAVAILABLE.to_string();
    };
    let ext = ext.to_ascii_lowercase();

    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| (*mime).to_string())
        .unwrap_or_else(|| MIME_UNAVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(infer_mime(Path::new("results.csv")), "text/csv");
        assert_eq!(infer_mime(Path::new("model.sav")), "application/x-spss-sav");
        assert_eq!(infer_mime(Path::new("analysis.ipynb")), "application/x-ipynb+json");
    }

    #[test]
    fn extension_case_is_ignored() {
        assert_eq!(infer_mime(Path::new("REPORT.PDF")), "application/pdf");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(infer_mime(Path::new("archive.xyz")), MIME_UNAVAILABLE);
        assert_eq!(infer_mime(Path::new("Makefile")), MIME_UNAVAILABLE);
    }
}
