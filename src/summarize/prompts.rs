/// Marker the model is told to emit when the page is not release notes.
pub const NOT_A_CHANGELOG: &str = "NOT A CHANGELOG";

pub const ANALYSIS_PROMPT: &str = r#"Carefully analyze the following content. Your task is to:

   - Provide an analysis section with:
     <h3>Product Name: What is the product name?</h3>
     <h4>Latest Core Version: What is the latest core/free version number, and the release date?</h4>
     <h4>Release Date: What is the release date for the latest core version?</h4>
     <h4>Core Release Summary:</h4> Summarize the latest core version release notes in few sentences (Highlight Key Changes, Notable Improvements, Impact Assessment, Breaking Changes).
     <h4>Latest Pro Version: What is the latest pro/premium version number, and the release date?</h4>
     <h4>Release Date: What is the release date for the latest pro version?</h4>
     <h4>Pro Release Summary:</h4> Summarize the latest pro version release notes in few sentences.

If it is NOT a changelog:
   Respond with a clear message: <h4>NOT A CHANGELOG: This page does not appear to be a valid changelog. It may be a generic page, documentation, or unrelated content.</h4>

Analyze this content carefully and provide a precise response:"#;

/// One-line request used to check that an API key is accepted.
pub const KEY_CHECK_PROMPT: &str = "Test message";

pub fn analysis_prompt(content: &str) -> String {
    format!("{}{}", ANALYSIS_PROMPT, content)
}
