use std::{
    fs,
    path::PathBuf,
    process::Command,
};

use log::debug;

use super::{RenderedImage, ShareError};

/// Where a receipt can be sent to
pub trait ShareTarget {
    /// Whether [``ShareTarget::share_file``] is supported at all
    fn can_share_files(&self) -> bool;

    /// Opens the share sheet with the image attached
    fn share_file(&self, image: &RenderedImage, title: &str, text: &str)
        -> Result<(), ShareError>;

    /// Saves the image for the user to send by hand
    fn download(&self, image: &RenderedImage) -> Result<PathBuf, ShareError>;

    fn open_url(&self, url: &str) -> Result<(), ShareError>;
}

/// A desktop without a share sheet.
///
/// Downloads go to a directory, links are opened with ``opener``
/// (e.g. ``xdg-open``) or printed when there is none.
#[derive(Debug, Clone)]
pub struct DesktopShare {
    download_dir: PathBuf,
    opener: Option<String>,
}

impl DesktopShare {
    pub fn new(download_dir: impl Into<PathBuf>, opener: &str) -> Self {
        let opener = opener.trim();
        Self {
            download_dir: download_dir.into(),
            opener: if opener.is_empty() {
                None
            } else {
                Some(opener.to_string())
            },
        }
    }
}

impl ShareTarget for DesktopShare {
    fn can_share_files(&self) -> bool {
        false
    }

    fn share_file(&self, _: &RenderedImage, _: &str, _: &str) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }

    fn download(&self, image: &RenderedImage) -> Result<PathBuf, ShareError> {
        fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(&image.file_name);
        fs::write(&path, &image.bytes)?;
        Ok(path)
    }

    fn open_url(&self, url: &str) -> Result<(), ShareError> {
        match &self.opener {
            Some(command) => {
                debug!("opening link with {}", command);
                let status = Command::new(command).arg(url).status()?;
                if status.success() {
                    Ok(())
                } else {
                    Err(ShareError::Opener {
                        command: command.clone(),
                        status,
                    })
                }
            }
            None => {
                println!("{}", url);
                Ok(())
            }
        }
    }
}
