//! Prompt builders for extraction and reconciliation

use crate::types::ChatMessage;

const EXTRACT_RELATIONS_PROMPT: &str = "\
You are an advanced algorithm designed to extract structured information from text to construct knowledge graphs. \
Your goal is to capture comprehensive information while maintaining accuracy. Follow these key principles:

1. Extract only explicitly stated information from the text.
2. Identify key entities, relationships among them, and their types.
3. Use \"USER_ID\" as the source node for any self-references (I, me, my, etc.) in user messages.
CUSTOM_PROMPT

Relationships:
- Use consistent, general, and timeless relationship types.
- Prefer \"professor\" over \"became_professor\".
- Only establish relationships among the entities explicitly mentioned in the text.

Entity consistency:
- Ensure relationships are coherent and logically align with the context of the message.
- Maintain consistent naming for entities across the extracted data.

Strive to construct a coherent and easily understandable knowledge graph by establishing all the relationships \
among the entities and adhering to the user's context. Adhere strictly to these guidelines to ensure high-quality \
knowledge graph extraction.";

const UPDATE_GRAPH_PROMPT: &str = "\
You are an AI expert specializing in graph memory management and optimization. Your task is to analyze existing \
graph memories alongside new information, and decide for every new relationship whether it must be added, whether \
it updates an existing memory, or whether nothing needs to change.

Input:
1. Existing Graph Memories: a list of current graph memories, each containing source, relationship, and destination.
2. New Graph Memory: fresh information to be integrated into the existing graph structure.

Guidelines:
1. Identification: use the source and destination as primary identifiers when matching existing memories with new \
information.
2. Conflict resolution: if new information contradicts or refines an existing memory, call update_graph_memory. \
When the destination itself changes, pass the old destination as previous_destination.
3. Addition: if a new relationship has no counterpart among the existing memories, call add_graph_memory with the \
types of both endpoints.
4. Duplicates: if the new information is already represented, call noop.
5. Consistency: keep a uniform naming style for relationship types, and never update a memory when the new \
information does not concern the same source and destination.

Existing Graph Memories:
{existing_memories}

New Graph Memory:
{new_memories}

Output: one tool call per decision.";

/// System prompt for entity extraction; self references resolve to `user_id`
pub fn entity_extraction_messages(user_id: &str, text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You are a smart assistant who understands entities and their types in a given text. \
             If user message contains self reference such as 'I', 'me', 'my' etc. then use {} as the \
             source entity. Extract all the entities from the text. ***DO NOT*** answer the question \
             itself if the given text is a question.",
            user_id
        )),
        ChatMessage::user(text),
    ]
}

/// Relation extraction messages
///
/// With a custom prompt the entity list is left out of the user message.
pub fn relation_extraction_messages<'a>(
    user_id: &str,
    text: &str,
    custom_prompt: Option<&str>,
    entities: impl Iterator<Item = &'a str>,
) -> Vec<ChatMessage> {
    let base = EXTRACT_RELATIONS_PROMPT.replace("USER_ID", user_id);

    match custom_prompt {
        Some(custom) => vec![
            ChatMessage::system(base.replace("CUSTOM_PROMPT", &format!("4. {}", custom))),
            ChatMessage::user(text),
        ],
        None => {
            let names: Vec<&str> = entities.collect();
            vec![
                ChatMessage::system(base.replace("CUSTOM_PROMPT", "")),
                ChatMessage::user(format!("List of entities: {:?}. \n\nText: {}", names, text)),
            ]
        }
    }
}

/// Single user message carrying both relation lists
pub fn update_memory_messages(existing_memories: &str, new_memories: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(
        UPDATE_GRAPH_PROMPT
            .replace("{existing_memories}", existing_memories)
            .replace("{new_memories}", new_memories),
    )]
}

/// One `source -- RELATIONSHIP -- destination` line per relation
pub fn format_relations<'a, I>(relations: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    relations
        .into_iter()
        .map(|(source, relation, destination)| {
            format!("{} -- {} -- {}", source, relation.to_uppercase(), destination)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
