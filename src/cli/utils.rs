use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.as_str().is_empty() {
        bail!("Must specify {} file", label);
    }
    if !filename.exists() {
        bail!("Can't find specified {} file: '{}'", label, filename);
    }
    if !filename.is_file() {
        bail!(
            "Specified {} file path does not appear to be a file: '{}'",
            label,
            filename
        );
    }
    Ok(())
}

/// Check an optional input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_optional_filename(filename_opt: Option<&Utf8Path>, label: &str) -> SimpleResult<()> {
    if let Some(filename) = filename_opt {
        check_required_filename(filename, label)?;
    }
    Ok(())
}

/// Check that an optional output file can be created in an existing directory
///
pub fn check_optional_output_filename(
    filename_opt: Option<&Utf8Path>,
    label: &str,
) -> SimpleResult<()> {
    if let Some(filename) = filename_opt {
        if filename.is_dir() {
            bail!(
                "Specified {} output file path is a directory: '{}'",
                label,
                filename
            );
        }
        if let Some(parent) = filename.parent() {
            if !parent.as_str().is_empty() && !parent.is_dir() {
                bail!(
                    "Directory of the {} output file does not exist: '{}'",
                    label,
                    parent
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let filename = root.join("calls.tsv");
        std::fs::write(&filename, "x").unwrap();

        assert!(check_required_filename(&filename, "source").is_ok());
        assert!(check_required_filename(&root.join("missing.tsv"), "source").is_err());
        assert!(check_required_filename(root, "source").is_err());
        assert!(check_optional_filename(None, "source").is_ok());

        assert!(check_optional_output_filename(Some(&root.join("stats.json")), "stats").is_ok());
        assert!(check_optional_output_filename(Some(root), "stats").is_err());
        assert!(
            check_optional_output_filename(Some(&root.join("a").join("stats.json")), "stats")
                .is_err()
        );
    }
}
