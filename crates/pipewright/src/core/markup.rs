//! Span-annotated markup parser
//!
//! A small chumsky grammar for the subset of XML that adapter configurations
//! use: elements, attributes, text, CDATA, comments, processing instructions
//! and a document type declaration. Every element and attribute carries the
//! byte span it occupies so text edits can be applied surgically.

use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use super::error::EditorError;
use super::tree::ElementView;
use super::types::Span;

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Attribute with its decoded value and source spans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Value with entities decoded
    pub value: String,
    /// From the first byte of the name to the closing quote
    pub span: Span,
    /// Raw value between the quotes
    pub value_span: Span,
}

/// One piece of element content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text { text: String, span: Span },
    CData { text: String, span: Span },
    Comment(Span),
    Instruction(Span),
}

impl Content {
    pub fn span(&self) -> Span {
        match self {
            Content::Element(element) => element.span,
            Content::Text { span, .. } | Content::CData { span, .. } => *span,
            Content::Comment(span) | Content::Instruction(span) => *span,
        }
    }
}

/// Element with spans for the whole element, its tags and its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub name_span: Span,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Content>,
    pub span: Span,
    /// `<Name ...>` or the whole `<Name .../>`
    pub open_tag: Span,
    /// Offset just past the last attribute (or the tag name)
    pub attrs_end: usize,
    /// `</Name>`, absent for self-closing elements
    pub close_tag: Option<Span>,
}

impl Element {
    pub fn is_self_closing(&self) -> bool {
        self.close_tag.is_none()
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == key)
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == tag)
    }

    /// Bytes between the opening and closing tags
    pub fn inner_span(&self) -> Option<Span> {
        self.close_tag
            .map(|close| Span::new(self.open_tag.end, close.start))
    }

    /// Offset of the `>` or `/>` that ends the opening tag
    pub fn open_tag_close(&self) -> usize {
        if self.is_self_closing() {
            self.open_tag.end - 2
        } else {
            self.open_tag.end - 1
        }
    }

    /// Depth-first search over this element and its descendants
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&Element) -> bool) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_into(pred, &mut found);
        found
    }

    fn collect_into<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, found: &mut Vec<&'a Element>) {
        if pred(self) {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_into(pred, found);
        }
    }
}

impl ElementView for Element {
    fn tag(&self) -> &str {
        &self.name
    }

    fn child_elements(&self, tag: &str) -> Vec<&Self> {
        self.elements().filter(|e| e.name == tag).collect()
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attribute(key).map(|a| a.value.as_str())
    }
}

fn to_span(span: SimpleSpan) -> Span {
    Span::new(span.start, span.end)
}

/// Parse a whole document and return its root element
pub fn parse_markup(text: &str) -> Result<Element, EditorError> {
    document_parser()
        .parse(text)
        .into_result()
        .map_err(|errors| {
            let (message, offset) = errors
                .first()
                .map(|e| (e.to_string(), e.span().start))
                .unwrap_or_else(|| ("empty document".to_string(), 0));
            let (line, column) = line_column(text, offset);
            EditorError::unparsable(message, line, column)
        })
}

fn document_parser<'src>() -> impl Parser<'src, &'src str, Element, Extra<'src>> {
    let ws = one_of(" \t\r\n").repeated();
    let name = none_of(" \t\r\n<>/=!?\"'").repeated().at_least(1).to_slice();

    let double_quoted = just('"')
        .ignore_then(
            none_of("\"<")
                .repeated()
                .to_slice()
                .map_with(|raw: &str, e| (raw, to_span(e.span()))),
        )
        .then_ignore(just('"'));
    let single_quoted = just('\'')
        .ignore_then(
            none_of("'<")
                .repeated()
                .to_slice()
                .map_with(|raw: &str, e| (raw, to_span(e.span()))),
        )
        .then_ignore(just('\''));

    let attribute = name
        .clone()
        .then_ignore(ws.clone())
        .then_ignore(just('='))
        .then_ignore(ws.clone())
        .then(double_quoted.or(single_quoted))
        .map_with(|(name, (raw, value_span)): (&str, (&str, Span)), e| Attribute {
            name: name.to_string(),
            value: decode_entities(raw),
            span: to_span(e.span()),
            value_span,
        })
        .labelled("attribute");

    let attributes = one_of(" \t\r\n")
        .repeated()
        .at_least(1)
        .ignore_then(attribute)
        .repeated()
        .collect::<Vec<_>>();

    let open_tag = just('<')
        .ignore_then(
            name.clone()
                .map_with(|n: &str, e| (n.to_string(), to_span(e.span()))),
        )
        .then(attributes)
        .then_ignore(ws.clone());

    let comment = just("<!--")
        .then(any().and_is(just("-->").not()).repeated())
        .then(just("-->"))
        .map_with(|_, e| to_span(e.span()));

    let instruction = just("<?")
        .then(any().and_is(just("?>").not()).repeated())
        .then(just("?>"))
        .map_with(|_, e| to_span(e.span()));

    let doctype = just("<!DOCTYPE")
        .then(none_of(">").repeated())
        .then(just('>'))
        .ignored();

    let cdata = just("<![CDATA[")
        .ignore_then(any().and_is(just("]]>").not()).repeated().to_slice())
        .then_ignore(just("]]>"))
        .map_with(|text: &str, e| Content::CData {
            text: text.to_string(),
            span: to_span(e.span()),
        });

    let text = none_of("<")
        .repeated()
        .at_least(1)
        .to_slice()
        .map_with(|raw: &str, e| Content::Text {
            text: decode_entities(raw),
            span: to_span(e.span()),
        });

    let misc = choice((
        comment.clone().ignored(),
        instruction.clone().ignored(),
        doctype,
        one_of(" \t\r\n").repeated().at_least(1).ignored(),
    ))
    .repeated();

    let element = recursive(|element| {
        let content = choice((
            comment.map(Content::Comment),
            cdata,
            instruction.map(Content::Instruction),
            element.map(Content::Element),
            text,
        ))
        .repeated()
        .collect::<Vec<_>>();

        let close_tag = just("</")
            .ignore_then(name)
            .then_ignore(ws)
            .then_ignore(just('>'))
            .map_with(|n: &str, e| (n.to_string(), to_span(e.span())));

        let empty_element = open_tag
            .clone()
            .then_ignore(just("/>"))
            .map_with(|((name, name_span), attributes): ((String, Span), Vec<Attribute>), e| {
                let span = to_span(e.span());
                let attrs_end = attrs_end(name_span, &attributes);
                Element {
                    name,
                    name_span,
                    attributes,
                    children: Vec::new(),
                    span,
                    open_tag: span,
                    attrs_end,
                    close_tag: None,
                }
            });

        let full_element = open_tag
            .then_ignore(just('>'))
            .map_with(|tag: ((String, Span), Vec<Attribute>), e| (tag, to_span(e.span())))
            .then(content)
            .then(close_tag)
            .try_map(
                |(((((name, name_span), attributes), open_span), children), (close_name, close_span)): (
                    ((((String, Span), Vec<Attribute>), Span), Vec<Content>),
                    (String, Span),
                ),
                 span: SimpleSpan| {
                    if close_name != name {
                        return Err(Rich::custom(
                            SimpleSpan::from(close_span.start..close_span.end),
                            format!("closing tag </{}> does not match <{}>", close_name, name),
                        ));
                    }
                    let attrs_end = attrs_end(name_span, &attributes);
                    Ok(Element {
                        name,
                        name_span,
                        attributes,
                        children,
                        span: to_span(span),
                        open_tag: open_span,
                        attrs_end,
                        close_tag: Some(close_span),
                    })
                },
            );

        empty_element.or(full_element)
    });

    just('\u{feff}')
        .or_not()
        .ignore_then(misc.clone())
        .ignore_then(element)
        .then_ignore(misc)
        .then_ignore(end())
}

fn attrs_end(name_span: Span, attributes: &[Attribute]) -> usize {
    attributes
        .last()
        .map(|a| a.span.end)
        .unwrap_or(name_span.end)
}

/// 1-based line and column for a byte offset
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset.min(text.len())).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

/// Decode the predefined and numeric character references
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|semi| *semi <= 12)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    }
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<!-- adapters -->
<Configuration name="Demo">
  <Adapter name='Orders'>
    <Pipeline firstPipe="Read">
      <EchoPipe name="Read" x="10"/>
      <Exit path="EXIT" state="success"/>
    </Pipeline>
  </Adapter>
</Configuration>
"#;

    #[test]
    fn test_parse_nested_elements() {
        let root = parse_markup(SAMPLE).unwrap();
        assert_eq!(root.name, "Configuration");
        assert_eq!(root.attribute("name").map(|a| a.value.as_str()), Some("Demo"));

        let adapter = root.children_named("Adapter").next().unwrap();
        assert_eq!(adapter.attr("name"), Some("Orders"));
        let pipeline = adapter.children_named("Pipeline").next().unwrap();
        let tags: Vec<&str> = pipeline.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(tags, vec!["EchoPipe", "Exit"]);
    }

    #[test]
    fn test_element_view_with_borrowed_tag() {
        let root = parse_markup(SAMPLE).unwrap();
        let adapters = {
            let tag = String::from("Adapter");
            root.child_elements(&tag)
        };
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].tag(), "Adapter");
        assert!(adapters[0].child_elements("Receiver").is_empty());
    }

    #[test]
    fn test_spans_point_into_source() {
        let root = parse_markup(SAMPLE).unwrap();
        let stage = &root.find_all(&|e| e.name == "EchoPipe")[0];
        assert_eq!(stage.span.slice(SAMPLE), r#"<EchoPipe name="Read" x="10"/>"#);
        assert!(stage.is_self_closing());

        let x = stage.attribute("x").unwrap();
        assert_eq!(x.span.slice(SAMPLE), r#"x="10""#);
        assert_eq!(x.value_span.slice(SAMPLE), "10");
        assert_eq!(stage.attrs_end, x.span.end);
        assert_eq!(&SAMPLE[stage.open_tag_close()..stage.open_tag.end], "/>");

        let pipeline = &root.find_all(&|e| e.name == "Pipeline")[0];
        let close = pipeline.close_tag.unwrap();
        assert_eq!(close.slice(SAMPLE), "</Pipeline>");
        assert_eq!(&SAMPLE[pipeline.open_tag_close()..pipeline.open_tag.end], ">");
    }

    #[test]
    fn test_mismatched_close_tag_reports_position() {
        let err = parse_markup("<A>\n  <B></C>\n</A>").unwrap_err();
        match err {
            EditorError::Unparsable { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unclosed_document_is_unparsable() {
        assert!(parse_markup("<Configuration><Adapter>").is_err());
        assert!(parse_markup("").is_err());
        assert!(parse_markup("just text").is_err());
    }

    #[test]
    fn test_comments_and_cdata() {
        let root = parse_markup("<a><!-- x --><![CDATA[<raw> & ]]>tail</a>").unwrap();
        assert!(matches!(root.children[0], Content::Comment(_)));
        assert_eq!(
            root.children[1],
            Content::CData {
                text: "<raw> & ".to_string(),
                span: Span::new(13, 33)
            }
        );
        assert!(matches!(&root.children[2], Content::Text { text, .. } if text == "tail"));
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(decode_entities("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");

        let root = parse_markup(r#"<a q="x &quot;y&quot;">1 &gt; 0</a>"#).unwrap();
        assert_eq!(root.attr("q"), Some("x \"y\""));
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute(r#"a<"b"&"#), "a&lt;&quot;b&quot;&amp;");
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("ab\ncd", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("ab", 99), (1, 3));
    }
}
