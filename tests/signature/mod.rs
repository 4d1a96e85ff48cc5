mod matching;
mod roundtrip;
