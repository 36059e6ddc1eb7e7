#![allow(dead_code)]
pub const TEST_DOCUMENT: &str = r##"
{
   "id" : "did:example:123",
   "verificationMethod" : [
      {
         "id" : "did:example:123#key-1",
         "controller" : "did:example:123",
         "type" : "Ed25519VerificationKey2018",
         "publicKeyBase58" : "3qbR1eZRqXUWroWKKYhbDmR3FfqTHfqSU8zZSxtANzYh"
      }
   ],
   "assertionMethod" : [
      "did:example:123#key-1"
   ]
}
"##;

pub const TEST_CREDENTIAL: &str = r##"
{
   "@context" : [
      "https://www.w3.org/2018/credentials/v1",
      "https://www.w3.org/2018/credentials/examples/v1"
   ],
   "id" : "https://example.edu/credentials/3732",
   "type" : [
      "VerifiableCredential",
      "UniversityDegreeCredential"
   ],
   "credentialSubject" : {
      "id" : "did:example:subject",
      "degree" : {
         "type" : "BachelorDegree",
         "name" : "Bachelor of Science and Arts"
      }
   },
   "issuer" : "did:example:issuer",
   "issuanceDate" : "2023-06-01T12:00:00Z",
   "nonTransferable" : true
}
"##;

pub const TEST_PRESENTATION: &str = r##"
{
   "@context" : "https://www.w3.org/2018/credentials/v1",
   "type" : "VerifiablePresentation",
   "holder" : "did:example:holder",
   "verifiableCredential" : [
      {
         "@context" : [
            "https://www.w3.org/2018/credentials/v1",
            "https://www.w3.org/2018/credentials/examples/v1"
         ],
         "id" : "https://example.edu/credentials/3732",
         "type" : [
            "VerifiableCredential",
            "UniversityDegreeCredential"
         ],
         "credentialSubject" : {
            "id" : "did:example:subject",
            "degree" : {
               "type" : "BachelorDegree",
               "name" : "Bachelor of Science and Arts"
            }
         },
         "issuer" : "did:example:issuer",
         "issuanceDate" : "2023-06-01T12:00:00Z",
         "nonTransferable" : true
      }
   ]
}
"##;
