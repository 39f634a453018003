/// The maximum length, in characters, of the short descriptive fields
pub const SHORT_TEXT_LENGTH: usize = 256;
/// The maximum length, in characters, of [`TextInfo::capturing`] and [`TextInfo::description`]
pub const LONG_TEXT_LENGTH: usize = 4096;

/// Free-form descriptive text attached to a file.
///
/// [`TextInfo::capturing`] and [`TextInfo::description`] are long blocks written by
/// the acquisition software that often embed `key: value` settings, see
/// [`mine_text_info`](crate::meta::mine_text_info).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextInfo {
    pub image_id: String,
    pub image_type: String,
    pub group: String,
    pub sample_id: String,
    pub author: String,
    pub description: String,
    pub capturing: String,
    pub sampling: String,
    pub location: String,
    pub date: String,
    pub conclusion: String,
    pub info1: String,
    pub info2: String,
    pub optics: String,
}

impl TextInfo {
    /// The scalar fields paired with the names the decoding engine gives them
    pub fn scalar_fields(&self) -> [(&'static str, &str); 12] {
        [
            ("wszImageID", self.image_id.as_str()),
            ("wszType", self.image_type.as_str()),
            ("wszGroup", self.group.as_str()),
            ("wszSampleID", self.sample_id.as_str()),
            ("wszAuthor", self.author.as_str()),
            ("wszSampling", self.sampling.as_str()),
            ("wszLocation", self.location.as_str()),
            ("wszDate", self.date.as_str()),
            ("wszConclusion", self.conclusion.as_str()),
            ("wszInfo1", self.info1.as_str()),
            ("wszInfo2", self.info2.as_str()),
            ("wszOptics", self.optics.as_str()),
        ]
    }

    /// The two long text blocks joined the way they are mined: capturing first
    pub fn combined_text(&self) -> String {
        format!("{}\n{}", self.capturing, self.description)
    }
}
