use std::path::Path;

/// A file handed to the app by the user, held in memory until it is indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Display name (no directory components).
    pub name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name for attribution.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased extension of the file name, empty if there is none.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        let file = UploadedFile::new("Report.PDF", vec![]);
        assert_eq!(file.extension(), "pdf");
        assert_eq!(UploadedFile::new("README", vec![]).extension(), "");
    }

    #[test]
    fn from_path_keeps_file_name_only() {
        let dir = std::env::temp_dir().join(format!("pdfchat-core-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let file = UploadedFile::from_path(&path).unwrap();
        assert_eq!(file.name, "notes.pdf");
        assert_eq!(file.size(), 8);

        std::fs::remove_dir_all(&dir).ok();
    }
}
