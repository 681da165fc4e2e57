use serial_keygen::*;

pub fn main() {
    // Use the same wide-character policy that generated the keys.
    let mut verifier = Verifier::new(WideCharPolicy::Reject);

    // Block a username.
    // You might want to do this if the user requested a refund or a key
    // was leaked.
    verifier.block("leaked-user");

    // Verify a serial key.
    match verifier.verify("hacktooth", "436540B3") {
        Status::Valid => println!("Key is valid!"),
        Status::Invalid => println!("Key is invalid!"),
        Status::Blocked => println!("Username has been blocked!"),
        Status::Malformed => println!("That is not even a serial key!"),
    }
}
