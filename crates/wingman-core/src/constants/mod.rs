// ABOUTME: Application constants organized by domain
// ABOUTME: Fallback strings that keep nickname, description and reply values non-empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

/// Fallback values substituted whenever model output is missing or unusable
pub mod defaults {
    /// Nickname used when the model output names none
    pub const NICKNAME: &str = "Chat Pal";

    /// Nickname used when the model returned nothing at all
    pub const NICKNAME_EMPTY_RESPONSE: &str = "Mystery Girl";

    /// Description used when the combined call yields no description
    pub const IMAGE_RECEIVED: &str = "Image(s) received.";

    /// Description used when the description-only call returns blank text
    pub const IMAGE_ANALYZED: &str = "Image(s) analyzed.";

    /// Description used when the description-only call fails
    pub const IMAGE_ANALYSIS_FAILED: &str = "Error analyzing image(s).";

    /// Latest-message placeholder for image-only turns
    pub const IMAGE_ONLY_PLACEHOLDER: &str = "[Image(s) provided]";

    /// Preferred country when the user has not chosen one
    pub const PREFERRED_COUNTRY: &str = "auto";
}

/// Token hints for the auxiliary completion calls
pub mod limits {
    /// Output hint for description and description+nickname calls
    pub const IMAGE_ANALYSIS_MAX_TOKENS: u32 = 250;

    /// Output hint for nickname-only calls
    pub const NICKNAME_MAX_TOKENS: u32 = 20;

    /// Output hint for the critique pass
    pub const CRITIQUE_MAX_TOKENS: u32 = 800;

    /// Temperature for the critique pass
    pub const CRITIQUE_TEMPERATURE: f32 = 0.2;

    /// Suggestions must be strictly longer than this
    pub const SUGGESTION_MIN_CHARS: usize = 5;

    /// Suggestions must be strictly shorter than this
    pub const SUGGESTION_MAX_CHARS: usize = 500;
}
