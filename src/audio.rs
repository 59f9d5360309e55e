use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioLocation {
    pub directory: String,
    pub file: String,
}

impl AudioLocation {
    pub fn resolve(file: &str) -> Self {
        Self {
            directory: audio_directory(file),
            file: file.to_string(),
        }
    }

    pub fn url(&self, base: &str) -> String {
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.directory,
            self.file
        )
    }
}

/// Media bucket for a pronunciation file name.
pub fn audio_directory(file: &str) -> String {
    if file.starts_with("bix") {
        return "bix".to_string();
    }
    if file.starts_with("gg") {
        return "gg".to_string();
    }
    match file.chars().next() {
        Some(first) if first.is_ascii_digit() => "number".to_string(),
        Some(first) => first.to_lowercase().collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rules_pick_directories() {
        assert_eq!(audio_directory("bixxyz"), "bix");
        assert_eq!(audio_directory("ggword"), "gg");
        assert_eq!(audio_directory("7hello"), "number");
        assert_eq!(audio_directory("apple"), "a");
    }

    #[test]
    fn bix_wins_over_single_letter_bucket() {
        assert_eq!(audio_directory("bixyz001.wav"), "bix");
        assert_eq!(audio_directory("bit00001.wav"), "b");
        assert_eq!(audio_directory("g0001.wav"), "g");
    }

    #[test]
    fn single_letter_bucket_is_lowercased() {
        assert_eq!(audio_directory("Apple.wav"), "a");
    }

    #[test]
    fn builds_retrieval_url() {
        let location = AudioLocation::resolve("cat00001.wav");
        assert_eq!(
            location.url("https://media.merriam-webster.com/soundc11/"),
            "https://media.merriam-webster.com/soundc11/c/cat00001.wav"
        );
    }

    #[test]
    fn empty_name_is_total() {
        let location = AudioLocation::resolve("");
        assert_eq!(location.directory, "");
    }
}
