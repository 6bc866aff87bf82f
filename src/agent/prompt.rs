//! System prompt construction
//!
//! The prompt is rebuilt per conversation so the real customer name and
//! phone are bound into it. Tools that take customer identity must receive
//! these exact values; the prompt says so explicitly because models love to
//! substitute placeholders.

use chrono::{DateTime, Datelike, Utc};

use crate::state::{HistoryTurn, Role};

const WEEKDAYS_PT: [&str; 7] = [
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
    "Domingo",
];

/// Build the system prompt for one conversation
#[must_use]
pub fn system_prompt(customer_name: &str, customer_phone: &str, now: DateTime<Utc>) -> String {
    let weekday = WEEKDAYS_PT[now.weekday().num_days_from_monday() as usize];
    let stamp = now.format("%d/%m/%Y %H:%M");

    format!(
        "Você é a Carol, a agente de atendimento da Centro-Oeste Drywall & Dry. \
Você atende clientes pelo WhatsApp com simpatia e eficiência, e é \
especializada em drywall, gesso, forros e divisórias.

DADOS REAIS DO CLIENTE DESTA CONVERSA:
Nome: {customer_name}
Telefone: {customer_phone}

Quando usar qualquer ferramenta que peça nome ou telefone do cliente, use \
EXATAMENTE os dados acima. Nunca use valores genéricos ou inventados como \
\"Cliente\" ou \"556299999999\"; {customer_name} é o nome real da pessoa \
conversando com você e {customer_phone} é o telefone real desta conversa.

Suas prioridades: agendar visita técnica (ferramenta schedule_visit) e, \
quando o cliente pedir para falar direto com o técnico ou a situação for \
urgente, encaminhar com contact_technician. Esclareça dúvidas sobre \
serviços, preços e prazos, mas nunca invente informações; quando não tiver \
certeza, ofereça a visita técnica como solução.

Data e hora atuais: {stamp} ({weekday}). Use esta referência para calcular \
datas relativas como \"amanhã\" ou \"semana que vem\".

FORMATO DA RESPOSTA: escreva texto corrido e natural, como uma conversa de \
WhatsApp. É proibido usar formatação markdown: nada de listas com hífen, \
asteriscos, bullets ou numeração, nada de negrito ou itálico. Se precisar \
enumerar coisas, escreva em texto corrido. Respostas curtas, no máximo 3 a 4 \
parágrafos, separados por uma linha em branco. Nunca escreva sequências de \
escape como \\n. Use o nome do cliente quando soar natural e finalize \
perguntando se pode ajudar em mais alguma coisa, variando a forma de perguntar."
    )
}

/// Render recent history ahead of the current message, the way the model
/// sees it: plain text, oldest first.
#[must_use]
pub fn compose_input(history: &[HistoryTurn], current: &str) -> String {
    if history.is_empty() {
        return current.to_string();
    }
    let mut text = String::from("=== HISTÓRICO DA CONVERSA ===\n");
    for turn in history {
        let speaker = match turn.role {
            Role::Customer => "Cliente",
            Role::Assistant => "Carol",
        };
        text.push_str(speaker);
        text.push_str(": ");
        text.push_str(&turn.content);
        text.push('\n');
    }
    text.push_str("\n=== MENSAGEM ATUAL ===\n");
    text.push_str(current);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_real_customer_data() {
        let prompt = system_prompt("Maria Souza", "5511999990000", Utc::now());
        assert!(prompt.contains("Maria Souza"));
        assert!(prompt.contains("5511999990000"));
        assert!(!prompt.contains("{customer_name}"));
    }

    #[test]
    fn input_without_history_is_the_message_itself() {
        assert_eq!(compose_input(&[], "oi"), "oi");
    }

    #[test]
    fn input_with_history_keeps_order_and_labels() {
        let history = vec![
            HistoryTurn { role: Role::Customer, content: "quanto custa?".into() },
            HistoryTurn { role: Role::Assistant, content: "depende da área".into() },
        ];
        let input = compose_input(&history, "uns 20m²");
        let customer_pos = input.find("Cliente: quanto custa?").unwrap();
        let assistant_pos = input.find("Carol: depende da área").unwrap();
        let current_pos = input.find("MENSAGEM ATUAL").unwrap();
        assert!(customer_pos < assistant_pos);
        assert!(assistant_pos < current_pos);
        assert!(input.ends_with("uns 20m²"));
    }
}
