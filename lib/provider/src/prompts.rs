//! System prompts for the model calls the pipeline makes.

pub const SUMMARIZE_SYSTEM: &str = "\
Extract the information from the conversation in a structured format.
Focus on: what the user is looking for, their key requirements, preferences, and any deal-breakers.
Be concise and factual.";

pub const IDEAL_SYSTEM: &str = r#"Based on the conversation, create an ideal rental listing that matches what the user is looking for.
Return JSON with this schema (use null for unspecified fields):
{
    "available": "string date or 'Now' or null",
    "bills_included": "Yes" or "No" or null,
    "couples_ok": "Yes" or "No" or null,
    "detail": "string - detailed description of the ideal property",
    "furnishings": "Furnished" or "Unfurnished" or null,
    "location": "string - preferred area/location",
    "minimum_term": "string e.g. '6 months', '12 months' or null",
    "parking": "Yes" or "No" or null,
    "pets_ok": "Yes" or "No" or null,
    "postcode": "string postcode area or null",
    "property_type": "House share" or "Flat share" or "Studio" or null,
    "max_rent": number - maximum monthly rent or null,
    "min_rent": number - minimum monthly rent or null,
    "target_location": "string - place user needs to commute to (e.g. 'Bank Station', 'Canary Wharf') or null",
    "max_commute": "string - acceptable commute time (e.g. '30 minutes', '45 min by tube') or null"
}
Extract preferences from the conversation. Only set fields that are mentioned or clearly implied.
For target_location, look for workplace, office, university, or places they mentioned needing to get to."#;

pub const RULES_SYSTEM: &str = r#"You extract search filters from user messages about room hunting in London.

RULES:
- Only extract preferences, not vague mentions or questions
- Be reasonably strict: "under £700" or "max £700" → extract budget.
- "I need pets allowed" or "I have a dog" → extract pets_allowed. "do you allow pets?" → don't extract
- If user states a preference confidently, extract it. If they're asking or unsure, don't.

LOCATION - Split into TWO parts:
- target_location: WHERE they need to commute to (workplace, station, uni, friend's place)
- max_commute: HOW FAR is acceptable (time or description)

Return a JSON array of rules. Each rule has: field, value, and optionally unit.
Supported fields:
- max_budget (integer, unit: "GBP")
- target_location (string - place user commutes TO)
- max_commute (string - acceptable travel time, e.g. "30 minutes")
- pets_allowed (boolean)
- bills_included (boolean)
- couples_ok (boolean)
- parking (boolean)
- furnished (boolean)

Return the COMPLETE updated list (keep existing rules unless user contradicts them)."#;

pub const SCORE_SCHEMA: &str = r#"Return JSON with this schema:
{
    "location_match": {"reasoning": "string - MUST mention estimated commute time to target location if specified", "score": number (1-100)},
    "price_match": {"reasoning": "string - consider value for money, not just if it's under budget", "score": number (1-100)},
    "amenities_match": {"reasoning": "string", "score": number (1-100)},
    "visual_quality": {"reasoning": "string - MUST describe what you see in the images: room size, light, cleanliness, furniture quality, overall vibe", "score": number (1-100)},
    "overall_reasoning": "string - 2-3 sentence summary emphasizing visual appeal",
    "overall_score": number (1-100)
}

Be critical and realistic. 50 is average, 70+ is good, 90+ is excellent. A beautiful room should significantly boost the overall score."#;

/// Builds the scoring system prompt, with a commute section when the
/// ideal names a destination.
pub fn score_system(target_location: Option<&str>, max_commute: Option<&str>) -> String {
    let commute_section = match target_location {
        Some(target) => format!(
            "\nIMPORTANT - COMMUTE REQUIREMENTS:\n\
             The user needs to commute to: {target}\n\
             Ideal max commute: {}\n\n\
             When scoring location_match, HEAVILY weight the commute:\n\
             - Use your knowledge of London geography and transport links\n\
             - Consider: Is this listing on a direct tube/bus line to their destination?\n\
             - Estimate the likely commute time and compare to their requirement\n\
             - A listing far from their workplace should score LOW on location even if it's a nice area\n",
            max_commute.unwrap_or("not specified, assume ~40 minutes")
        ),
        None => String::new(),
    };

    format!(
        "You are evaluating a rental listing for a user searching for accommodation in London.\n\n\
         Analyze how well this listing matches the user's preferences and ideal listing criteria.\n\
         {commute_section}\n\
         IMPORTANT - IMAGE ANALYSIS:\n\
         Look carefully at the listing photos and evaluate:\n\
         - Room quality: Is it spacious, well-lit, clean, modern?\n\
         - Furniture & decor: Quality of bed, desk, storage, overall style\n\
         - Common areas: Kitchen, bathroom, living room condition\n\
         - Red flags: Clutter, poor maintenance, cramped spaces, dark rooms\n\
         - Overall appeal: Would this be a nice place to live?\n\n\
         WITHIN BUDGET, PRIORITIZE THE NICEST LOOKING ROOMS. A listing that's under budget but looks \
         great should score higher than one at the budget limit that looks average.\n\n\
         {SCORE_SCHEMA}"
    )
}
