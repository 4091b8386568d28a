#![no_main]

use arbitrary::Arbitrary;
use ldapsync::{expand, DirectoryEntry, Tokenizer};
use ldapsync::tokens::find_tokens;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    dn: String,
    attributes: Vec<(String, Vec<Vec<u8>>)>,
    template: String,
}

fuzz_target!(|input: FuzzInput| {
    let mut entry = DirectoryEntry::new(input.dn);
    for (name, values) in input.attributes {
        entry.add_attribute(name, values.into_iter().map(Into::into).collect());
    }

    let tokenizer = Tokenizer::default();
    let Ok(tokens) = tokenizer.tokenize(&entry, &find_tokens(&input.template)) else {
        return;
    };

    let first = expand(&tokens, &input.template);
    assert_eq!(first, expand(&tokens, &input.template));
});
