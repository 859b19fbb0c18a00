use formsaathi::field::field_model::{DomNode, NodeStyle, PageSnapshot, Rect};

pub fn node(tag: &str, parent: Option<usize>) -> DomNode {
    DomNode {
        tag: tag.into(),
        parent,
        rect: Some(Rect { width: 200.0, height: 24.0 }),
        ..Default::default()
    }
}

pub fn input(parent: usize, input_type: &str) -> DomNode {
    DomNode {
        r#type: Some(input_type.into()),
        ..node("input", Some(parent))
    }
}

pub fn text(mut el: DomNode, text: &str) -> DomNode {
    el.text = Some(text.into());
    el
}

pub fn hidden_style() -> NodeStyle {
    NodeStyle {
        display: "none".into(),
        ..Default::default()
    }
}

/// Newsletter form:
///
/// ```text
/// 0 form
/// 1   div "Email Subscribe to our newsletter"
/// 2     label for=subscribe-email "Email"
/// 3     input[type=email name=subscribe id=subscribe-email]
/// 4   input[type=submit]
/// ```
pub fn newsletter_page() -> PageSnapshot {
    let mut email = input(1, "email");
    email.name = Some("subscribe".into());
    email.id = Some("subscribe-email".into());
    email.placeholder = Some("you@example.com".into());

    let mut label = text(node("label", Some(1)), "Email");
    label.html_for = Some("subscribe-email".into());

    PageSnapshot {
        url: "https://shop.example.com/newsletter".into(),
        title: "Newsletter".into(),
        nodes: vec![
            node("form", None),
            text(node("div", Some(0)), "Email Subscribe to our newsletter"),
            label,
            email,
            input(0, "submit"),
        ],
    }
}

/// `newsletter_page` after a Phone field was rendered ahead of Email:
///
/// ```text
/// 0 form
/// 1   div
/// 2     label for=phone "Phone"
/// 3     input[type=tel name=phone id=phone]
/// 4     label for=subscribe-email "Email"
/// 5     input[type=email name=subscribe id=subscribe-email]
/// 6   input[type=submit]
/// ```
pub fn newsletter_page_with_phone() -> PageSnapshot {
    let mut page = newsletter_page();

    let mut label = text(node("label", Some(1)), "Phone");
    label.html_for = Some("phone".into());
    let mut phone = input(1, "tel");
    phone.name = Some("phone".into());
    phone.id = Some("phone".into());

    page.nodes.insert(2, phone);
    page.nodes.insert(2, label);
    page
}

/// Three radio buttons that ask the same question: same name, no id, each
/// wrapped in its own `<label>` with the same text.
///
/// ```text
/// 0 form
/// 1   fieldset "Preferred contact"
/// 2     label "Contact"   3 input[radio name=contact]
/// 4     label "Contact"   5 input[radio name=contact]
/// 6     label "Contact"   7 input[radio name=contact]
/// ```
pub fn radio_group_page() -> PageSnapshot {
    let mut nodes = vec![
        node("form", None),
        text(node("fieldset", Some(0)), "Preferred contact"),
    ];
    for _ in 0..3 {
        let label_index = nodes.len();
        nodes.push(text(node("label", Some(1)), "Contact"));
        let mut radio = input(label_index, "radio");
        radio.name = Some("contact".into());
        radio.rect = Some(Rect { width: 0.0, height: 0.0 });
        nodes.push(radio);
    }

    PageSnapshot {
        url: "https://forms.example.org/contact".into(),
        title: "Contact".into(),
        nodes,
    }
}
