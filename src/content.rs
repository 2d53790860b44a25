//! Built-in question bank
//!
//! A compact argumentation bank so the game runs without external data.
//! Prompt, options, correct index, explanation.

use crate::quiz::Question;

const QUESTIONS: &[(&str, &[&str], usize, &str)] = &[
    (
        "What are the main components of a strong argument?",
        &[
            "Claim, Evidence, Warrant, Impact",
            "Introduction, Body, Conclusion",
            "Topic, Opinion, Facts",
            "Statement, Proof, Summary",
        ],
        0,
        "A strong argument consists of a Claim (your position), Evidence (supporting facts), \
         Warrant (logical connection), and Impact (why it matters).",
    ),
    (
        "What is the purpose of a warrant in an argument?",
        &[
            "To provide statistical evidence",
            "To link evidence to the claim",
            "To conclude the argument",
            "To introduce the topic",
        ],
        1,
        "A warrant explains how and why the evidence supports your claim, creating the logical \
         bridge between them.",
    ),
    (
        "What is the fallacy of 'ad hominem'?",
        &[
            "Using false statistics",
            "Attacking the person instead of their argument",
            "Making hasty generalizations",
            "Using circular reasoning",
        ],
        1,
        "Ad hominem is attacking the character or attributes of the person making an argument \
         rather than addressing the argument itself.",
    ),
    (
        "What is a 'strawman' fallacy?",
        &[
            "Using weak evidence",
            "Misrepresenting an argument to attack it easily",
            "Being too emotional",
            "Speaking too quietly",
        ],
        1,
        "A strawman fallacy involves mischaracterizing or oversimplifying an opponent's position \
         to make it easier to attack.",
    ),
    (
        "In formal debate, what is a 'rebuttal'?",
        &[
            "Your opening argument",
            "A response to opponent's arguments",
            "A closing summary",
            "A question to the opponent",
        ],
        1,
        "A rebuttal directly addresses and challenges the opponent's arguments, showing why they \
         are flawed or insufficient.",
    ),
    (
        "What is the burden of proof in debate?",
        &[
            "The obligation to be polite",
            "The responsibility to prove your claims",
            "The duty to ask questions",
            "The need to speak loudly",
        ],
        1,
        "Burden of proof is the obligation to provide sufficient evidence and reasoning to \
         support your claims and convince the audience.",
    ),
    (
        "Which type of evidence is typically most persuasive in policy debates?",
        &[
            "Personal anecdotes",
            "Statistical data",
            "Historical examples",
            "Emotional appeals",
        ],
        1,
        "Statistical data provides quantifiable, verifiable support that is especially powerful \
         in policy discussions.",
    ),
    (
        "What is the purpose of cross-examination in debate?",
        &[
            "To make friends",
            "To clarify and challenge arguments",
            "To give a speech",
            "To present new evidence",
        ],
        1,
        "Cross-examination allows debaters to ask pointed questions to clarify, expose \
         weaknesses, or challenge the opponent's case.",
    ),
];

/// Build the default bank. Ids are 1-based to match the authored content.
pub fn default_bank() -> Vec<Question> {
    QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, &(prompt, options, correct, explanation))| Question {
            id: i as u32 + 1,
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
            explanation: explanation.to_string(),
        })
        .collect()
}
