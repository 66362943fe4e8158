use axum::extract::Multipart;

/// An uploaded file with its data and metadata.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Parsed form fields from the multipart upload.
pub struct FormFields {
    pub disease_name: String,
    pub file: UploadedFile,
}

/// Parse a multipart form upload into structured form fields.
///
/// Both a non-empty `disease_name` and a `pdf` file are required.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<FormFields, String> {
    let mut file: Option<UploadedFile> = None;
    let mut disease_name = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf" => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                check_not_empty(&filename, &data)?;
                file = Some(UploadedFile { filename, data });
            }
            "disease_name" => {
                disease_name = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read disease_name: {}", e))?
                    .trim()
                    .to_string();
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    if disease_name.is_empty() {
        return Err("Please enter a disease name".to_string());
    }
    let file = file.ok_or("No file uploaded")?;

    Ok(FormFields { disease_name, file })
}

/// Whether the bytes form a readable PDF is left to the PDF backend.
fn check_not_empty(filename: &str, data: &[u8]) -> Result<(), String> {
    if data.is_empty() {
        return Err(format!("{} is empty", filename));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_format_checks_to_the_backend() {
        assert!(check_not_empty("paper.pdf", b"%PDF-1.7\n...").is_ok());
        assert!(check_not_empty("paper.pdf", b"\xEF\xBB\xBF%PDF-1.4").is_ok());
        assert!(check_not_empty("paper.pdf", b"GIF89a").is_ok());
    }

    #[test]
    fn rejects_empty_file() {
        let err = check_not_empty("paper.pdf", b"").unwrap_err();
        assert!(err.contains("empty"));
    }
}
