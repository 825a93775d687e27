use std::fs;
use std::path::Path;

use anyhow::Context;

/// Wipe `dir` and create it again, empty. Whatever was there is lost.
pub fn prepare_output_dir(dir: &Path) -> anyhow::Result<()> {
    if let Err(err) = fs::remove_dir_all(dir) {
        log::debug!("not removing {}: {err}", dir.display());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    log::info!("prepared empty output directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::prepare_output_dir;

    #[test]
    fn wipes_existing_content() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("nested")).unwrap();
        std::fs::write(out.join("nested/old.deb"), b"stale").unwrap();
        std::fs::write(out.join("top.txt"), b"stale").unwrap();

        prepare_output_dir(&out).expect("output should be prepared");

        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn creates_missing_parents() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let out = dir.path().join("a/b/c");

        prepare_output_dir(&out).expect("output should be prepared");
        assert!(out.is_dir());
    }

    #[test]
    fn fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let out = dir.path().join("occupied");
        std::fs::write(&out, b"file").unwrap();

        let err = prepare_output_dir(&out).expect_err("a file cannot become a directory");
        assert!(err.to_string().contains("creating output directory"));
    }
}
