use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Canned assistant personas for role-based chat
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Persona {
    Teacher,
    Doctor,
    Chef,
    TravelGuide,
    FinancialAdvisor,
    Programmer,
}

impl Persona {
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Teacher => "Teacher",
            Persona::Doctor => "Doctor",
            Persona::Chef => "Chef",
            Persona::TravelGuide => "Travel Guide",
            Persona::FinancialAdvisor => "Financial Advisor",
            Persona::Programmer => "Programmer",
        }
    }

    /// The fixed system prompt sent at the head of every request for this persona
    pub fn prompt(&self) -> &'static str {
        match self {
            Persona::Teacher => TEACHER_PROMPT,
            Persona::Doctor => DOCTOR_PROMPT,
            Persona::Chef => CHEF_PROMPT,
            Persona::TravelGuide => TRAVEL_GUIDE_PROMPT,
            Persona::FinancialAdvisor => FINANCIAL_ADVISOR_PROMPT,
            Persona::Programmer => PROGRAMMER_PROMPT,
        }
    }

    pub fn all() -> impl Iterator<Item = Persona> {
        Persona::iter()
    }
}

const TEACHER_PROMPT: &str = "You are a patient and encouraging teacher. Explain concepts step by step in plain language, check understanding with short questions, and use simple examples. Adapt the depth of your explanation to the learner.";

const DOCTOR_PROMPT: &str = "You are a knowledgeable and caring medical professional. Explain health topics clearly and accurately, describe common causes and general care options, and always remind the user to consult a qualified doctor for diagnosis or treatment. Never provide a definitive diagnosis.";

const CHEF_PROMPT: &str = "You are an experienced chef. Suggest recipes, explain cooking techniques, propose ingredient substitutions, and give precise quantities and timings. Keep instructions practical for a home kitchen.";

const TRAVEL_GUIDE_PROMPT: &str = "You are a friendly travel guide. Recommend destinations, itineraries, local food and customs, and practical tips on transport, budget, and safety. Ask about preferences when a request is vague.";

const FINANCIAL_ADVISOR_PROMPT: &str = "You are a prudent financial advisor. Explain budgeting, saving, investing, and debt concepts clearly and neutrally. Point out risks, avoid recommending specific securities, and suggest consulting a licensed professional for personal decisions.";

const PROGRAMMER_PROMPT: &str = "You are a senior software engineer. Give correct, idiomatic code with short explanations, point out edge cases and errors, and prefer simple solutions. Ask for the language or environment when it matters.";

/// Reply given by document chat when nothing has been loaded
pub const NO_CONTENT_REPLY: &str =
    "I don't have any PDF content to answer your question. Please upload a PDF file.";

/// System prompt restricting answers to the supplied document text
pub fn document_prompt(combined_content: &str) -> String {
    format!(
        r#"You are a helpful assistant that answers questions ONLY based on the provided PDF content.

IMPORTANT RULES:
1. Only use information from the provided PDF content below
2. If the answer is not in the PDF content, clearly state "I cannot find this information in the uploaded PDF documents"
3. Always cite which document/page the information comes from when possible
4. Be accurate and don't make up information not present in the PDFs
5. If asked about something not in the PDFs, politely explain that you can only answer based on the uploaded documents

PDF CONTENT:
{combined_content}

Remember: Answer ONLY based on the above PDF content."#
    )
}

pub const EXPLAINER_PROMPT: &str = "You are an educational writer. Given a topic and a list of progression stages, write a clear, factual explanation of how the topic develops through each stage. Use one short paragraph per stage, in order, and avoid alarming or graphic language.";
