//! Extension-based media classification

use crate::config::{MediaExtensions, RunOptions};
use std::collections::HashSet;
use std::path::Path;

/// Media class of a file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    Image,
    Video,
    NotMedia,
}

impl MediaClass {
    /// Destination root folder name for this class
    pub fn folder_name(&self) -> Option<&'static str> {
        match self {
            MediaClass::Image => Some(crate::config::PHOTOS_DIR),
            MediaClass::Video => Some(crate::config::VIDEOS_DIR),
            MediaClass::NotMedia => None,
        }
    }
}

/// Classifies paths against fixed image and video extension sets
#[derive(Debug, Clone)]
pub struct FileClassifier {
    images: HashSet<String>,
    videos: HashSet<String>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(&MediaExtensions::default())
    }
}

impl FileClassifier {
    pub fn new(extensions: &MediaExtensions) -> Self {
        Self {
            images: normalize(&extensions.images),
            videos: normalize(&extensions.videos),
        }
    }

    /// Classify a path by its extension, ignoring case
    pub fn classify(&self, path: &Path) -> MediaClass {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return MediaClass::NotMedia;
        };
        let ext = ext.to_lowercase();

        if self.images.contains(&ext) {
            MediaClass::Image
        } else if self.videos.contains(&ext) {
            MediaClass::Video
        } else {
            MediaClass::NotMedia
        }
    }

    /// Whether the active options want this path organized
    pub fn should_organize(&self, path: &Path, options: &RunOptions) -> bool {
        match self.classify(path) {
            MediaClass::Image => options.organize_images,
            MediaClass::Video => options.organize_videos,
            MediaClass::NotMedia => false,
        }
    }
}

fn normalize(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify(Path::new("a/IMG_0001.JPG")), MediaClass::Image);
        assert_eq!(classifier.classify(Path::new("a/raw.Cr2")), MediaClass::Image);
        assert_eq!(classifier.classify(Path::new("clip.MoV")), MediaClass::Video);
        assert_eq!(classifier.classify(Path::new("notes.txt")), MediaClass::NotMedia);
        assert_eq!(classifier.classify(Path::new("README")), MediaClass::NotMedia);
        assert_eq!(classifier.classify(Path::new(".jpg")), MediaClass::NotMedia);
    }

    #[test]
    fn test_should_organize_respects_options() {
        let classifier = FileClassifier::default();
        let mut options = RunOptions::for_source("/src");

        assert!(classifier.should_organize(Path::new("x.jpg"), &options));
        assert!(classifier.should_organize(Path::new("x.mp4"), &options));

        options.organize_images = false;
        assert!(!classifier.should_organize(Path::new("x.jpg"), &options));
        assert!(classifier.should_organize(Path::new("x.mp4"), &options));

        options.organize_videos = false;
        assert!(!classifier.should_organize(Path::new("x.mp4"), &options));
        assert!(!classifier.should_organize(Path::new("x.txt"), &options));
    }

    #[test]
    fn test_custom_extensions_are_normalized() {
        let classifier = FileClassifier::new(&MediaExtensions {
            images: vec![".WEBP".into()],
            videos: vec!["3GP".into(), "".into()],
        });
        assert_eq!(classifier.classify(Path::new("a.webp")), MediaClass::Image);
        assert_eq!(classifier.classify(Path::new("a.3gp")), MediaClass::Video);
        assert_eq!(classifier.classify(Path::new("a.jpg")), MediaClass::NotMedia);
    }

    #[test]
    fn test_folder_names() {
        assert_eq!(MediaClass::Image.folder_name(), Some("Photos"));
        assert_eq!(MediaClass::Video.folder_name(), Some("Videos"));
        assert_eq!(MediaClass::NotMedia.folder_name(), None);
    }
}
